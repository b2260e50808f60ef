use dbflow_core::{Model, ModelHooks};
use dbflow_schema::EntityDecl;

/// A model that can describe its own storage mapping.
///
/// Usually derived with `#[derive(Table)]`. The declaration is planned into
/// an adapter when the owning [`crate::DatabaseBuilder`] is built.
pub trait Table: Model + ModelHooks {
    /// Declaration facts for the generation pipeline.
    fn entity_decl() -> EntityDecl;
}
