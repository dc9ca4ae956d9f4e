use irexdb::collection::{Document, DocumentStore};
use irexdb::database::Database;
use irexdb::database_config::{FlushPolicy, PersistenceMode};
use irexdb::doc;
use irexdb::errors::IrexResult;
use std::backtrace::Backtrace;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tempfile::TempDir;

/// Runs a test between `before` and `after`, retrying a failed attempt.
///
/// `after` also runs when the test fails, so scratch directories are released.
pub fn run_test<T, B, A>(before: B, test: T, after: A)
where
    T: Fn(TestContext) -> IrexResult<()> + std::panic::UnwindSafe + std::panic::RefUnwindSafe,
    B: Fn() -> IrexResult<TestContext> + std::panic::UnwindSafe + std::panic::RefUnwindSafe,
    A: Fn(TestContext) -> IrexResult<()> + std::panic::UnwindSafe + std::panic::RefUnwindSafe,
{
    const MAX_RETRIES: u32 = 2;
    let mut last_error: Option<String> = None;
    let mut last_backtrace: Option<String> = None;

    for attempt in 1..=MAX_RETRIES {
        let start_time = Instant::now();

        let result = std::panic::catch_unwind(|| {
            let backtrace = Backtrace::capture();
            match before() {
                Ok(ctx) => match test(ctx.clone()) {
                    Ok(_) => after(ctx).map_err(|e| {
                        (format!("After run failed: {:?}", e), backtrace.to_string())
                    }),
                    Err(e) => {
                        let _ = after(ctx);
                        Err((format!("Test failed: {:?}", e), backtrace.to_string()))
                    }
                },
                Err(e) => Err((format!("Before run failed: {:?}", e), backtrace.to_string())),
            }
        });

        let elapsed = start_time.elapsed();

        match result {
            Ok(Ok(_)) => return,
            Ok(Err((e, bt))) => {
                last_error = Some(e.clone());
                last_backtrace = Some(bt);
                if attempt < MAX_RETRIES {
                    eprintln!(
                        "\n========== Test Attempt {}/{} Failed (took {:?}) ==========",
                        attempt, MAX_RETRIES, elapsed
                    );
                    eprintln!("Error: {}", e);
                    thread::sleep(Duration::from_millis(100 * attempt as u64));
                }
            }
            Err(panic_err) => {
                let err_msg = if let Some(s) = panic_err.downcast_ref::<&str>() {
                    s.to_string()
                } else if let Some(s) = panic_err.downcast_ref::<String>() {
                    s.clone()
                } else {
                    "Unknown panic".to_string()
                };

                last_error = Some(format!("Panic: {}", err_msg));
                last_backtrace = None;
                if attempt < MAX_RETRIES {
                    eprintln!(
                        "\n========== Test Attempt {}/{} Panicked (took {:?}) ==========",
                        attempt, MAX_RETRIES, elapsed
                    );
                    eprintln!("{}", err_msg);
                    thread::sleep(Duration::from_millis(100 * attempt as u64));
                }
            }
        }
    }

    eprintln!("\n==================== TEST FAILED ====================");
    eprintln!("Last error: {}", last_error.as_deref().unwrap_or("Unknown"));
    if let Some(bt) = &last_backtrace {
        if !bt.is_empty() && !bt.contains("disabled") {
            eprintln!("\nBacktrace:\n{}", bt);
        }
    }
    eprintln!("=====================================================\n");

    panic!(
        "Test failed after {} attempts. Last error: {}",
        MAX_RETRIES,
        last_error.unwrap_or_default()
    );
}

/// An open database plus the scratch directory and settings it was opened with.
#[derive(Clone)]
pub struct TestContext {
    dir: Arc<TempDir>,
    mode: PersistenceMode,
    policy: FlushPolicy,
    db: Database,
}

impl TestContext {
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn datafile(&self, collection: &str) -> PathBuf {
        self.dir.path().join(format!("{}.db", collection))
    }

    pub fn db(&self) -> Database {
        self.db.clone()
    }

    /// Closes the database and opens a fresh one over the same directory.
    pub fn reopen(&self) -> IrexResult<TestContext> {
        self.db.close()?;
        let db = open_database(self.dir.path(), self.mode, self.policy)?;
        Ok(TestContext {
            dir: self.dir.clone(),
            mode: self.mode,
            policy: self.policy,
            db,
        })
    }
}

pub fn open_database(path: &Path, mode: PersistenceMode, policy: FlushPolicy) -> IrexResult<Database> {
    Database::builder()
        .path(path)
        .persistence_mode(mode)
        .flush_policy(policy)
        .open()
}

pub fn create_context(mode: PersistenceMode, policy: FlushPolicy) -> IrexResult<TestContext> {
    let dir = tempfile::tempdir()?;
    let db = open_database(dir.path(), mode, policy)?;
    Ok(TestContext {
        dir: Arc::new(dir),
        mode,
        policy,
        db,
    })
}

/// Append-log database flushing every mutation.
pub fn create_test_context() -> IrexResult<TestContext> {
    create_context(PersistenceMode::AppendLog, FlushPolicy::Immediate)
}

pub fn create_snapshot_test_context() -> IrexResult<TestContext> {
    create_context(PersistenceMode::Snapshot, FlushPolicy::Immediate)
}

pub fn create_manual_test_context() -> IrexResult<TestContext> {
    create_context(PersistenceMode::AppendLog, FlushPolicy::Manual)
}

pub fn cleanup(ctx: TestContext) -> IrexResult<()> {
    if let Err(e) = ctx.db().close() {
        eprintln!("Warning: Failed to close database: {:?}", e);
    }
    Ok(())
}

pub fn create_test_docs() -> Vec<Document> {
    vec![
        doc! {
            "_id": "irex-core",
            name: "irex-core",
            version: 3,
            kind: "lib",
            tags: ["db", "json"],
            meta: { owner: "ops", downloads: 1200 },
        },
        doc! {
            "_id": "irex-cli",
            name: "irex-cli",
            version: 1,
            kind: "bin",
            tags: ["cli"],
            meta: { owner: "dev", downloads: 300 },
        },
        doc! {
            "_id": "irex-web",
            name: "irex-web",
            version: 2.5,
            kind: "lib",
            tags: ["http", "json"],
            meta: { owner: "ops", downloads: 50 },
        },
    ]
}

pub fn insert_test_documents(collection: &DocumentStore) -> IrexResult<()> {
    collection.insert_many(create_test_docs())?;
    Ok(())
}

pub fn ids(docs: &[Document]) -> Vec<String> {
    docs.iter()
        .filter_map(|doc| doc.id().map(|id| id.to_string()))
        .collect()
}
