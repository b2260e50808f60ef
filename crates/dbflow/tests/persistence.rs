//! Registered models: persistence, queries, the registry and transactions.

mod fixtures;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, OnceLock};

use dbflow::{
    BuildError, DatabaseBuilder, DatabaseDefinition, DatabaseWrapper, Error, ModelHooks,
    ModelPersistence, QueuedTransaction, StoreModelsTransaction, Table, Transaction,
    TransactionQueue, Value,
};
use fixtures::{MemoryCursor, MockDatabase};

#[derive(Table, Debug, Default, Clone, PartialEq)]
#[table(database = "Persistence")]
struct Recruit {
    #[primary_key(autoincrement)]
    id: i64,
    #[column]
    #[not_null]
    name: String,
}

#[derive(Table, Debug, Default, Clone)]
#[table(database = "Persistence", hooks)]
struct Sighting {
    #[primary_key]
    code: String,
    #[column]
    place: Option<String>,
    loaded: bool,
}

impl ModelHooks for Sighting {
    fn on_load(&mut self) {
        self.loaded = true;
    }
}

#[derive(Table, Debug, Default, Clone)]
#[table(database = "Persistence")]
struct Checkpoint {
    #[primary_key(rowid)]
    id: i64,
    #[column]
    label: String,
}

#[derive(Table, Debug, Default, Clone)]
#[table(database = "Nowhere")]
struct Orphan {
    #[primary_key(autoincrement)]
    id: i64,
}

fn registered() -> Arc<DatabaseDefinition> {
    static DEFINITION: OnceLock<Arc<DatabaseDefinition>> = OnceLock::new();
    DEFINITION
        .get_or_init(|| {
            let definition = DatabaseBuilder::new("Persistence", 1)
                .table::<Recruit>()
                .table::<Sighting>()
                .table::<Checkpoint>()
                .build()
                .unwrap();
            dbflow::register_database(definition).unwrap()
        })
        .clone()
}

fn recruit_row(id: i64, name: &str) -> Vec<Value> {
    vec![Value::Integer(id), Value::Text(name.to_string())]
}

#[test]
fn test_save_inserts_then_updates() {
    registered();
    let db = MockDatabase::new();
    db.set_next_insert_id(7);

    let mut recruit = Recruit {
        name: "Tarantula".into(),
        ..Recruit::default()
    };
    assert!(recruit.save(&db).unwrap());
    assert_eq!(recruit.id, 7);
    let insert = db.last_statement().unwrap();
    assert_eq!(insert.sql, "INSERT INTO `Recruit`(`name`) VALUES(?)");
    assert_eq!(insert.binds.get(&1), Some(&Value::Text("Tarantula".into())));

    recruit.name = "Black Lion".into();
    assert!(recruit.save(&db).unwrap());
    let update = db.last_statement().unwrap();
    assert_eq!(update.sql, "UPDATE `Recruit` SET `id`=?,`name`=? WHERE `id`=?");
    assert_eq!(update.binds.get(&3), Some(&Value::Integer(7)));
    assert!(recruit.exists(&db).unwrap());
}

#[test]
fn test_rowid_key_is_assigned_by_the_engine() {
    registered();
    let db = MockDatabase::new();
    db.set_next_insert_id(3);

    let mut checkpoint = Checkpoint {
        label: "bridge".into(),
        ..Checkpoint::default()
    };
    assert!(checkpoint.save(&db).unwrap());
    let insert = db.last_statement().unwrap();
    assert_eq!(insert.sql, "INSERT INTO `Checkpoint`(`label`) VALUES(?)");
    assert_eq!(insert.binds.len(), 1);
    assert_eq!(checkpoint.id, 3);

    assert!(checkpoint.save(&db).unwrap());
    assert!(db.last_statement().unwrap().sql.starts_with("UPDATE `Checkpoint`"));
}

#[test]
fn test_update_and_delete() {
    registered();
    let db = MockDatabase::new();
    let mut recruit = Recruit {
        id: 4,
        name: "Captain North".into(),
    };

    db.set_affected_rows(0);
    assert!(!recruit.update(&db).unwrap());
    assert!(!recruit.delete(&db).unwrap());
    assert_eq!(recruit.id, 4);

    db.set_affected_rows(1);
    assert!(recruit.delete(&db).unwrap());
    assert_eq!(db.last_statement().unwrap().sql, "DELETE FROM `Recruit` WHERE `id`=?");
    assert_eq!(recruit.id, 0);
    assert!(!recruit.exists(&db).unwrap());
}

#[test]
fn test_load_by_primary_key() {
    registered();
    let db = MockDatabase::new();
    db.push_result(MemoryCursor::new(&["id", "name"], vec![recruit_row(1, "Spider-Boy")]));

    let mut recruit = Recruit {
        id: 1,
        ..Recruit::default()
    };
    assert!(recruit.load(&db).unwrap());
    assert_eq!(recruit.name, "Spider-Boy");
    assert_eq!(
        db.queries.borrow().as_slice(),
        ["SELECT * FROM `Recruit` WHERE `id`=1 LIMIT 1"]
    );

    let mut missing = Recruit {
        id: 2,
        name: "unchanged".into(),
    };
    assert!(!missing.load(&db).unwrap());
    assert_eq!(missing.name, "unchanged");
}

#[test]
fn test_query_list_and_single() {
    registered();
    let db = MockDatabase::new();
    db.push_result(MemoryCursor::new(
        &["id", "name"],
        vec![recruit_row(1, "Deadpond"), recruit_row(2, "Rusty-Man")],
    ));
    db.push_result(MemoryCursor::new(&["id", "name"], vec![recruit_row(2, "Rusty-Man")]));

    let all = dbflow::select_from::<Recruit>().unwrap().into_where();
    let recruits: Vec<Recruit> = dbflow::query_list(&all, &db).unwrap();
    assert_eq!(
        recruits.iter().map(|r| r.name.as_str()).collect::<Vec<_>>(),
        ["Deadpond", "Rusty-Man"]
    );

    let first: Option<Recruit> = dbflow::query_single(&all, &db).unwrap();
    assert_eq!(first.map(|r| r.id), Some(2));

    let queries = db.queries.borrow();
    assert_eq!(queries[0], "SELECT * FROM `Recruit`");
    assert_eq!(queries[1], "SELECT * FROM `Recruit` LIMIT 1");
}

#[test]
fn test_load_hook_runs() {
    registered();
    let db = MockDatabase::new();
    db.push_result(MemoryCursor::new(
        &["code", "place"],
        vec![vec![Value::Text("x1".into()), Value::Null]],
    ));

    let mut sighting = Sighting {
        code: "x1".into(),
        place: Some("stale".into()),
        ..Sighting::default()
    };
    assert!(sighting.load(&db).unwrap());
    assert!(sighting.loaded);
    assert_eq!(sighting.place, None);
}

#[test]
fn test_unregistered_model() {
    registered();
    let db = MockDatabase::new();
    let mut orphan = Orphan::default();
    assert!(matches!(orphan.save(&db), Err(Error::NotRegistered(_))));
    assert!(matches!(dbflow::select_from::<Orphan>(), Err(Error::NotRegistered(_))));
    assert!(db.statements.borrow().is_empty());
}

#[test]
fn test_registry_lookups() {
    let definition = registered();
    assert!(Arc::ptr_eq(&dbflow::database("Persistence").unwrap(), &definition));
    assert!(Arc::ptr_eq(&dbflow::database_for::<Recruit>().unwrap(), &definition));
    assert_eq!(dbflow::database_for_entity("Sighting").unwrap().name(), "Persistence");
    assert!(dbflow::database_names().contains(&"Persistence".to_string()));
    assert!(matches!(dbflow::database("Atlantis"), Err(Error::NotRegistered(_))));

    let again = DatabaseBuilder::new("Persistence", 2).build().unwrap();
    assert!(matches!(
        dbflow::register_database(again),
        Err(BuildError::DuplicateDatabase(name)) if name == "Persistence"
    ));

    let scratch = DatabaseBuilder::new("Scratch", 1).build().unwrap();
    dbflow::register_database(scratch).unwrap();
    assert!(dbflow::database("Scratch").is_ok());
    assert!(dbflow::unregister_database("Scratch").is_some());
    assert!(dbflow::database("Scratch").is_err());
}

#[test]
fn test_queued_transaction_callbacks() {
    let db = MockDatabase::new();
    let succeeded = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&succeeded);
    QueuedTransaction::new(|db: &dyn DatabaseWrapper| db.exec_sql("DELETE FROM `Recruit`"))
        .name("purge")
        .on_success(move || flag.store(true, Ordering::SeqCst))
        .on_error(|err| panic!("unexpected error: {err}"))
        .run(&db)
        .unwrap();
    assert!(succeeded.load(Ordering::SeqCst));
    assert_eq!(
        *db.executed.borrow(),
        ["BEGIN", "DELETE FROM `Recruit`", "SUCCESSFUL", "END"]
    );

    let db = MockDatabase::new();
    db.fail_on("DROP");
    let failure = Arc::new(Mutex::new(None));
    let slot = Arc::clone(&failure);
    let result = QueuedTransaction::new(|db: &dyn DatabaseWrapper| db.exec_sql("DROP TABLE `Recruit`"))
        .on_success(|| panic!("should have failed"))
        .on_error(move |err| *slot.lock().unwrap() = Some(err.to_string()))
        .run(&db);
    assert!(result.is_err());
    assert!(failure.lock().unwrap().as_deref().is_some_and(|m| m.contains("DROP TABLE")));
    assert_eq!(*db.executed.borrow(), ["BEGIN", "END"]);

    let db = MockDatabase::new();
    QueuedTransaction::new(|db: &dyn DatabaseWrapper| db.exec_sql("VACUUM"))
        .without_transaction()
        .run(&db)
        .unwrap();
    assert_eq!(*db.executed.borrow(), ["VACUUM"]);
}

#[test]
fn test_store_models_transaction() {
    registered();
    let db = MockDatabase::new();
    db.set_next_insert_id(10);
    let mut store = StoreModelsTransaction::insert(vec![
        Recruit {
            name: "Dormammu".into(),
            ..Recruit::default()
        },
        Recruit {
            name: "Wong".into(),
            ..Recruit::default()
        },
    ]);
    store.execute(&db).unwrap();
    let ids: Vec<i64> = store.into_models().iter().map(|r| r.id).collect();
    assert_eq!(ids, [10, 11]);
    assert_eq!(db.statements.borrow().len(), 2);
}

/// Runs queued work in order when drained.
#[derive(Default)]
struct VecQueue {
    pending: Mutex<Vec<QueuedTransaction>>,
    quit: AtomicBool,
}

impl VecQueue {
    fn drain(&self, db: &dyn DatabaseWrapper) -> Vec<Option<String>> {
        let pending = std::mem::take(&mut *self.pending.lock().unwrap());
        let mut ran = Vec::new();
        for transaction in pending {
            if self.quit.load(Ordering::SeqCst) {
                break;
            }
            ran.push(transaction.task_name().map(str::to_string));
            transaction.run(db).unwrap();
        }
        ran
    }
}

impl TransactionQueue for VecQueue {
    fn add(&self, transaction: QueuedTransaction) {
        self.pending.lock().unwrap().push(transaction);
    }

    fn cancel(&self, name: &str) {
        self.pending
            .lock()
            .unwrap()
            .retain(|t| t.task_name() != Some(name));
    }

    fn quit(&self) {
        self.quit.store(true, Ordering::SeqCst);
    }
}

#[test]
fn test_transaction_queue_boundary() {
    let db = MockDatabase::new();
    let concrete = Arc::new(VecQueue::default());
    let handle: Arc<dyn TransactionQueue> = concrete.clone();
    handle.add(QueuedTransaction::new(|db: &dyn DatabaseWrapper| db.exec_sql("-- one")).name("one"));
    handle.add(QueuedTransaction::new(|db: &dyn DatabaseWrapper| db.exec_sql("-- two")).name("two"));
    handle.add(QueuedTransaction::new(|db: &dyn DatabaseWrapper| db.exec_sql("-- three")));
    handle.cancel("two");

    assert_eq!(concrete.drain(&db), [Some("one".to_string()), None]);
    assert_eq!(db.executed_sql(), ["-- one", "-- three"]);

    handle.add(QueuedTransaction::new(|db: &dyn DatabaseWrapper| db.exec_sql("-- four")));
    handle.quit();
    assert!(concrete.drain(&db).is_empty());
}
