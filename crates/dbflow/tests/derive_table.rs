//! `#[derive(Table)]` and `#[derive(SqlEnum)]` end to end: declaration
//! facts, accessors, and the adapters planned from them.

mod fixtures;

use dbflow::schema::{OneToManyMethod, TypeRef};
use dbflow::{
    DatabaseBuilder, DatabaseStatement, DatabaseWrapper, EntityKind, Error, FieldKind, FieldValue,
    FlowCursor, Model, ModelAdapter, SqlEnum, StoragePrimitive, Table, TypeConverter, Value,
};
use fixtures::{MemoryCursor, MockDatabase};

#[derive(SqlEnum, Debug, Clone, Copy, Default, PartialEq, Eq)]
enum Rank {
    #[default]
    Rookie,
    #[sql_enum(name = "vet")]
    Veteran,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Date(i64);

struct DateConverter;

impl TypeConverter for DateConverter {
    type Model = Date;
    const STORAGE: StoragePrimitive = StoragePrimitive::Integer;

    fn to_db(&self, model: &Date) -> Value {
        Value::Integer(model.0)
    }

    fn from_db(&self, value: Value) -> dbflow::Result<Date> {
        value
            .as_i64()
            .map(Date)
            .ok_or_else(|| Error::Conversion(format!("not a date: {value:?}")))
    }
}

#[derive(Table, Debug, Default, Clone, PartialEq)]
#[table(database = "Derived")]
struct Team {
    #[primary_key(autoincrement)]
    id: i64,
    #[column]
    #[not_null]
    name: String,
}

#[derive(Table, Debug, Default, Clone, PartialEq)]
#[table(database = "Derived", insert_conflict = "replace")]
struct Hero {
    #[primary_key(autoincrement)]
    id: i64,
    #[column(length = 64)]
    #[not_null]
    name: String,
    #[column]
    nickname: Option<String>,
    #[column(sql_enum)]
    rank: Rank,
    #[column]
    born: Option<Date>,
    #[foreign_key(on_delete = "cascade")]
    team: Option<Team>,
    #[column(skip)]
    scratch: u32,
}

#[derive(Table, Debug, Default, Clone, PartialEq)]
#[table(database = "Derived", view = "SELECT `name` FROM `Hero` WHERE `rank` = 'vet'", all_fields)]
struct Veteran {
    name: String,
}

#[derive(Table, Debug, Default)]
#[table(
    database = "Derived",
    name = "squads",
    unique_group(number = 1, on_conflict = "ignore"),
    index_group(number = 1, name = "squad_lookup"),
    one_to_many(name = "members", methods = "load, delete")
)]
struct Squad {
    #[primary_key]
    code: String,
    #[column]
    #[unique(group = 1)]
    #[index(group = 1)]
    region: String,
    #[column]
    #[unique(group = 1)]
    #[index(group = 1)]
    tier: i32,
}

#[test]
fn test_sql_enum_names() {
    assert_eq!(Rank::Rookie.sql_name(), "Rookie");
    assert_eq!(Rank::Veteran.sql_name(), "vet");
    assert_eq!(Rank::from_sql_name("vet"), Some(Rank::Veteran));
    assert_eq!(Rank::from_sql_name("Veteran"), None);
}

#[test]
fn test_entity_decl_facts() {
    let decl = Hero::entity_decl();
    assert_eq!(decl.type_name, "Hero");
    assert_eq!(decl.table.database, "Derived");
    assert_eq!(decl.table.insert_conflict, dbflow::ConflictAction::Replace);

    let members: Vec<(&str, bool)> = decl
        .members
        .iter()
        .map(|m| (m.name.as_str(), m.nullable))
        .collect();
    assert_eq!(
        members,
        [
            ("id", false),
            ("name", false),
            ("nickname", true),
            ("rank", false),
            ("born", true),
            ("team", true),
        ]
    );
    assert_eq!(decl.members[0].ty, TypeRef::Primitive(FieldKind::I64));
    assert_eq!(decl.members[3].ty, TypeRef::Enum("Rank".into()));
    assert_eq!(decl.members[4].ty, TypeRef::Custom("Date".into()));
    assert_eq!(decl.members[5].ty, TypeRef::Model("Team".into()));
    let name = decl.members[1].annotations.column.as_ref().unwrap();
    assert_eq!(name.length, Some(64));

    let squad = Squad::entity_decl();
    assert_eq!(squad.table.name.as_deref(), Some("squads"));
    assert_eq!(squad.one_to_many[0].methods, [OneToManyMethod::Load, OneToManyMethod::Delete]);
    let region = squad.members[1].annotations.unique.as_ref().unwrap();
    assert!(!region.unique);
    assert_eq!(region.groups, [1]);

    assert_eq!(Veteran::entity_decl().kind, EntityKind::View);
}

#[test]
fn test_model_accessors() {
    let mut hero = Hero {
        id: 3,
        name: "Rusty-Man".into(),
        rank: Rank::Veteran,
        born: Some(Date(-20)),
        ..Hero::default()
    };

    assert!(matches!(hero.get_field("rank"), Some(FieldValue::Enum(name)) if name == "vet"));
    assert!(matches!(hero.get_field("nickname"), Some(FieldValue::Null)));
    assert!(matches!(hero.get_field("born"), Some(FieldValue::Custom(_))));
    assert!(hero.get_field("scratch").is_none());

    hero.set_field("rank", FieldValue::Text("Rookie".into())).unwrap();
    assert_eq!(hero.rank, Rank::Rookie);
    hero.set_field("born", FieldValue::Null).unwrap();
    assert_eq!(hero.born, None);
    hero.set_field("born", FieldValue::custom(Date(7))).unwrap();
    assert_eq!(hero.born, Some(Date(7)));

    let err = hero.set_field("rank", FieldValue::Text("General".into())).unwrap_err();
    assert!(matches!(err, Error::Conversion(_)));
    let err = hero.set_field("power", FieldValue::Null).unwrap_err();
    assert!(matches!(err, Error::UnknownField { model: "Hero", .. }));

    let record: Vec<&str> = hero.to_record().into_iter().map(|(name, _)| name).collect();
    assert_eq!(record, ["id", "name", "nickname", "rank", "born", "team"]);
}

fn derived() -> dbflow::DatabaseDefinition {
    DatabaseBuilder::new("Derived", 1)
        .converter(DateConverter)
        .table::<Veteran>()
        .table::<Team>()
        .table::<Hero>()
        .build()
        .unwrap()
}

#[test]
fn test_planned_creation_queries() {
    let definition = derived();
    assert_eq!(
        definition.table_creation_queries(),
        [
            "CREATE TABLE IF NOT EXISTS `Team`(`id` INTEGER PRIMARY KEY AUTOINCREMENT, \
             `name` TEXT NOT NULL ON CONFLICT FAIL)",
            "CREATE TABLE IF NOT EXISTS `Hero`(`id` INTEGER PRIMARY KEY AUTOINCREMENT, \
             `name` TEXT(64) NOT NULL ON CONFLICT FAIL, `nickname` TEXT, `rank` TEXT, \
             `born` INTEGER, `team_id` INTEGER, FOREIGN KEY(`team_id`) REFERENCES `Team` (`id`) \
             ON UPDATE NO ACTION ON DELETE CASCADE)",
        ]
    );
    assert_eq!(
        definition.view_creation_queries(),
        ["CREATE VIEW IF NOT EXISTS `Veteran` AS SELECT `name` FROM `Hero` WHERE `rank` = 'vet'"]
    );
    let tables: Vec<&str> = definition.entities_of(EntityKind::Table).collect();
    assert_eq!(tables, ["Team", "Hero"]);
}

#[test]
fn test_planned_adapter_binds_and_loads() {
    let definition = derived();
    let adapter = definition.adapter::<Hero>().unwrap();
    assert_eq!(
        adapter.insert_statement_query(),
        "INSERT OR REPLACE INTO `Hero`(`name`, `nickname`, `rank`, `born`, `team_id`) VALUES(?,?,?,?,?)"
    );

    let db = MockDatabase::new();
    let hero = Hero {
        id: 9,
        name: "Dr. Weird".into(),
        rank: Rank::Veteran,
        born: Some(Date(1999)),
        team: Some(Team {
            id: 4,
            name: "Preventers".into(),
        }),
        ..Hero::default()
    };
    {
        let mut statement = db.compile_statement(&adapter.insert_statement_query()).unwrap();
        adapter.bind_to_insert_statement(statement.as_mut(), &hero).unwrap();
        statement.execute_insert().unwrap();
    }
    let binds = db.last_statement().unwrap().binds;
    assert_eq!(
        binds.into_values().collect::<Vec<_>>(),
        [
            Value::Text("Dr. Weird".into()),
            Value::Null,
            Value::Text("vet".into()),
            Value::Integer(1999),
            Value::Integer(4),
        ]
    );

    let mut cursor = MemoryCursor::new(
        &["id", "name", "nickname", "rank", "born", "team_id"],
        vec![vec![
            Value::Integer(9),
            Value::Text("Dr. Weird".into()),
            Value::Null,
            Value::Text("vet".into()),
            Value::Integer(1999),
            Value::Integer(4),
        ]],
    );
    assert!(cursor.move_to_first());
    let mut loaded = adapter.new_instance();
    adapter.load_from_cursor(&cursor, &mut loaded, &db).unwrap();
    assert_eq!(loaded.id, 9);
    assert_eq!(loaded.rank, Rank::Veteran);
    assert_eq!(loaded.born, Some(Date(1999)));
    assert_eq!(loaded.nickname, None);
    assert_eq!(loaded.team.as_ref().map(|t| t.id), Some(4));
}

#[test]
fn test_custom_column_needs_a_converter() {
    let err = DatabaseBuilder::new("Derived", 1)
        .table::<Team>()
        .table::<Hero>()
        .build()
        .unwrap_err();
    let dbflow::BuildError::Generation { diagnostics, .. } = err else {
        panic!("expected a generation error, got {err:?}");
    };
    let locations: Vec<String> = diagnostics.errors().map(|d| d.location()).collect();
    assert_eq!(locations, ["Hero.born"]);
    assert!(!diagnostics.has_element_errors("Hero"));
    assert!(!diagnostics.has_errors_for("Team"));
}
