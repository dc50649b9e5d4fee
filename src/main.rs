use clap::{Parser, Subcommand};
use std::path::PathBuf;
use thiserror::Error;

use chrono::Utc;
use student_kv::kv::{ImportReport, KvError, KvStore};
use student_kv::records::{seed_entries, Collection, Dataset, ValidationError};

#[derive(Error, Debug)]
pub enum AppError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("KV store error: {0}")]
    Kv(#[from] KvError),

    #[error(transparent)]
    Library(#[from] student_kv::Error),

    #[error("{}", format_validation(.0))]
    Validation(Vec<ValidationError>),

    #[error("Key not found: {0}")]
    NotFound(String),

    #[error("Import incomplete: {0}")]
    PartialImport(String),
}

impl From<ValidationError> for AppError {
    fn from(err: ValidationError) -> Self {
        AppError::Validation(vec![err])
    }
}

fn format_validation(errors: &[ValidationError]) -> String {
    let lines: Vec<String> = errors.iter().map(|e| format!("  {}", e)).collect();
    format!("Validation failed:\n{}", lines.join("\n"))
}

#[derive(Parser)]
#[command(name = "student-kv")]
#[command(about = "Prefix-indexed JSON document store for student records")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a new store
    Init {
        /// Store path
        #[arg(long, default_value = ".student-kv", env = "STUDENT_KV_PATH")]
        path: PathBuf,
    },

    /// Get the document stored at a key
    Get {
        /// The key to read (e.g. "student:1700000000000-abc123xyz")
        key: String,

        /// Also print the entry version
        #[arg(long)]
        version: bool,

        /// Store path
        #[arg(long, default_value = ".student-kv", env = "STUDENT_KV_PATH")]
        path: PathBuf,
    },

    /// Store a JSON document at a key
    Set {
        /// The key to write
        key: String,

        /// JSON document (mutually exclusive with --file)
        #[arg(conflicts_with = "file")]
        value: Option<String>,

        /// Read the JSON document from a file
        #[arg(long)]
        file: Option<PathBuf>,

        /// Store path
        #[arg(long, default_value = ".student-kv", env = "STUDENT_KV_PATH")]
        path: PathBuf,
    },

    /// Delete one or more keys (several keys are removed all-or-nothing)
    Del {
        /// Keys to delete
        #[arg(required = true)]
        keys: Vec<String>,

        /// Store path
        #[arg(long, default_value = ".student-kv", env = "STUDENT_KV_PATH")]
        path: PathBuf,
    },

    /// List documents (or keys) under a prefix
    List {
        /// Key prefix; empty lists everything
        #[arg(default_value = "")]
        prefix: String,

        /// Print keys only
        #[arg(long)]
        keys: bool,

        /// Print the number of matching keys only
        #[arg(long, conflicts_with = "keys")]
        count: bool,

        /// Store path
        #[arg(long, default_value = ".student-kv", env = "STUDENT_KV_PATH")]
        path: PathBuf,
    },

    /// Export every student and subject as JSON
    Export {
        /// Output file (stdout if not specified)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Store path
        #[arg(long, default_value = ".student-kv", env = "STUDENT_KV_PATH")]
        path: PathBuf,
    },

    /// Import students and subjects from a JSON export
    Import {
        /// File with `{"students": [...], "subjects": [...]}`
        input: PathBuf,

        /// Store path
        #[arg(long, default_value = ".student-kv", env = "STUDENT_KV_PATH")]
        path: PathBuf,
    },

    /// Delete every student and subject
    Clear {
        /// Store path
        #[arg(long, default_value = ".student-kv", env = "STUDENT_KV_PATH")]
        path: PathBuf,
    },

    /// Add the default subjects
    Seed {
        /// Store path
        #[arg(long, default_value = ".student-kv", env = "STUDENT_KV_PATH")]
        path: PathBuf,
    },
}

fn main() -> Result<(), AppError> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Init { path } => {
            let store = KvStore::init(&path)?;
            drop(store);
            println!("Initialized store at {}", path.display());
            Ok(())
        }
        Commands::Get { key, version, path } => {
            let store = KvStore::open(&path)?;
            let entry = store
                .get_entry(&key)?
                .ok_or_else(|| AppError::NotFound(key.clone()))?;
            if version {
                eprintln!("version: {}", entry.version);
            }
            println!("{}", serde_json::to_string_pretty(&entry.value)?);
            Ok(())
        }
        Commands::Set {
            key,
            value,
            file,
            path,
        } => {
            let text = match (value, file) {
                (Some(value), _) => value,
                (None, Some(file)) => std::fs::read_to_string(file)?,
                (None, None) => std::io::read_to_string(std::io::stdin())?,
            };
            let document: serde_json::Value = serde_json::from_str(&text)?;

            let store = KvStore::open(&path)?;
            let version = store.set(&key, &document)?;
            println!("Stored '{}' (version {})", key, version);
            Ok(())
        }
        Commands::Del { keys, path } => {
            let store = KvStore::open(&path)?;
            match keys.as_slice() {
                [key] => {
                    if store.del(key)? {
                        println!("Deleted '{}'", key);
                    } else {
                        println!("Key '{}' did not exist", key);
                    }
                }
                keys => {
                    let removed = store.mdel(keys)?;
                    println!("Deleted {} of {} key(s)", removed, keys.len());
                }
            }
            Ok(())
        }
        Commands::List {
            prefix,
            keys,
            count,
            path,
        } => {
            let store = KvStore::open(&path)?;
            if count {
                println!("{}", store.count_by_prefix(&prefix)?);
            } else if keys {
                for key in store.keys_by_prefix(&prefix)? {
                    println!("{}", key);
                }
            } else {
                for entry in store.entries_by_prefix(&prefix)? {
                    println!("{}\t{}", entry.key, serde_json::to_string(&entry.value)?);
                }
            }
            Ok(())
        }
        Commands::Export { output, path } => {
            let store = KvStore::open(&path)?;
            let mut all = store.export_all(&Collection::prefixes())?;
            let data: serde_json::Map<String, serde_json::Value> = Collection::ALL
                .iter()
                .map(|c| {
                    let documents = all.remove(c.prefix()).unwrap_or_default();
                    (c.name().to_string(), serde_json::Value::Array(documents))
                })
                .collect();
            let text = serde_json::to_string_pretty(&data)?;

            match output {
                Some(file) => {
                    std::fs::write(&file, text)?;
                    println!("Exported to {}", file.display());
                }
                None => println!("{}", text),
            }
            Ok(())
        }
        Commands::Import { input, path } => {
            let dataset = Dataset::from_file(&input)?;
            let entries = dataset
                .into_entries(Utc::now())
                .map_err(AppError::Validation)?;

            let store = KvStore::open(&path)?;
            let students = store.import_bulk(Collection::Students.prefix(), entries.students)?;
            let subjects = store.import_bulk(Collection::Subjects.prefix(), entries.subjects)?;
            report_failures(&students);
            report_failures(&subjects);

            let summary = format!(
                "{} of {} students and {} of {} subjects",
                students.imported(),
                students.total(),
                subjects.imported(),
                subjects.total()
            );
            if !students.is_complete() || !subjects.is_complete() {
                return Err(AppError::PartialImport(summary));
            }
            println!("Imported {}", summary);
            Ok(())
        }
        Commands::Clear { path } => {
            let store = KvStore::open(&path)?;
            let students = store.clear(&[Collection::Students.prefix()])?;
            let subjects = store.clear(&[Collection::Subjects.prefix()])?;
            println!("Cleared {} students and {} subjects", students, subjects);
            Ok(())
        }
        Commands::Seed { path } => {
            let store = KvStore::open(&path)?;
            let report = store.import_bulk(Collection::Subjects.prefix(), seed_entries(Utc::now())?)?;
            report_failures(&report);
            if !report.is_complete() {
                return Err(AppError::PartialImport(format!(
                    "{} of {} subjects",
                    report.imported(),
                    report.total()
                )));
            }
            println!("Seeded {} default subjects", report.imported());
            Ok(())
        }
    }
}

fn report_failures(report: &ImportReport) {
    for outcome in report.outcomes.iter().filter(|o| !o.is_ok()) {
        eprintln!(
            "  row {} ({}): {}",
            outcome.index,
            outcome.key,
            outcome.error.as_deref().unwrap_or("unknown error")
        );
    }
}
