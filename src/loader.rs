use polars::prelude::*;
use std::fs::{self, File};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::time::Instant;
use tracing::{debug, error, info, instrument};
use tracing_error::SpanTrace;

use crate::domain::{DirError, Record};

const REQUIRED_FIELDS: [&str; 4] = ["id", "name", "location", "industry"];

#[derive(Debug, PartialEq)]
enum FileType {
    JSON,
    CSV,
    PARQUET,
    ARROW,
}

/// Supplies the catalog. Called exactly once per session.
pub trait DataLoader: Send + 'static {
    fn load(&self) -> Result<Vec<Record>, DirError>;
}

/// Reads the catalog from a local JSON, CSV, Parquet or Arrow file.
#[derive(Debug, Clone)]
pub struct FileLoader {
    path: PathBuf,
}

impl FileLoader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn check_file(path: &Path) -> Result<FileType, DirError> {
        let metadata = fs::metadata(path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => DirError::FileNotFound,
            ErrorKind::PermissionDenied => DirError::PermissionDenied,
            _ => DirError::IoError(e),
        })?;
        if !metadata.is_file() {
            return Err(DirError::LoadingFailed("Not a file!".into()));
        }
        debug!("{} has {} bytes", path.display(), metadata.len());
        Self::detect_file_type(path)
    }

    fn detect_file_type(path: &Path) -> Result<FileType, DirError> {
        match path
            .extension()
            .and_then(|s| s.to_str())
            .map(|s| s.to_uppercase())
            .as_deref()
        {
            Some("JSON") => Ok(FileType::JSON),
            Some("CSV") => Ok(FileType::CSV),
            Some("PARQUET") | Some("PQ") => Ok(FileType::PARQUET),
            Some("ARROW") | Some("IPC") | Some("FEATHER") => Ok(FileType::ARROW),
            _ => Err(DirError::UnknownFileType),
        }
    }

    fn load_json(path: &Path) -> Result<DataFrame, PolarsError> {
        let file = File::open(path)?;
        JsonReader::new(file).finish()
    }

    // No schema inference, every column stays text as written.
    fn load_csv(path: &Path) -> Result<DataFrame, PolarsError> {
        LazyCsvReader::new(PlPath::Local(path.into()))
            .with_has_header(true)
            .with_infer_schema_length(Some(0))
            .finish()?
            .collect()
    }

    fn load_parquet(path: &Path) -> Result<DataFrame, PolarsError> {
        LazyFrame::scan_parquet(PlPath::Local(path.into()), ScanArgsParquet::default())?
            .collect()
    }

    fn load_arrow(path: &Path) -> Result<DataFrame, PolarsError> {
        LazyFrame::scan_ipc(
            PlPath::Local(path.into()),
            polars::io::ipc::IpcScanOptions,
            UnifiedScanArgs::default(),
        )?
        .collect()
    }
}

impl DataLoader for FileLoader {
    #[instrument(skip(self), fields(path = %self.path.display()))]
    fn load(&self) -> Result<Vec<Record>, DirError> {
        let start_time = Instant::now();
        let frame = match Self::check_file(&self.path)? {
            FileType::JSON => Self::load_json(&self.path)?,
            FileType::CSV => Self::load_csv(&self.path)?,
            FileType::PARQUET => Self::load_parquet(&self.path)?,
            FileType::ARROW => Self::load_arrow(&self.path)?,
        };
        let records = records_from_frame(&frame)?;
        info!(
            "Loaded {} records in {}ms",
            records.len(),
            start_time.elapsed().as_millis()
        );
        Ok(records)
    }
}

fn text_column(df: &DataFrame, name: &str) -> Result<Vec<String>, DirError> {
    let column = df
        .column(name)
        .map_err(|_| DirError::MissingField(name.to_string()))?
        .cast(&DataType::String)?;
    column
        .str()?
        .into_iter()
        .map(|value| {
            value
                .map(str::to_string)
                .ok_or_else(|| DirError::MissingField(name.to_string()))
        })
        .collect()
}

/// Turns a frame with the columns id, name, location and industry into records.
pub fn records_from_frame(df: &DataFrame) -> Result<Vec<Record>, DirError> {
    let [ids, names, locations, industries] = REQUIRED_FIELDS.map(|f| text_column(df, f));
    let records = ids?
        .into_iter()
        .zip(names?)
        .zip(locations?)
        .zip(industries?)
        .map(|(((id, name), location), industry)| Record::new(id, name, location, industry))
        .collect();
    Ok(records)
}

/// Handle to a load running in the background. Resolves at most once.
pub struct PendingLoad {
    receiver: Option<Receiver<Result<Vec<Record>, DirError>>>,
}

impl PendingLoad {
    /// Returns the load result once it is available. Later calls return `None`.
    pub fn poll(&mut self) -> Option<Result<Vec<Record>, DirError>> {
        let receiver = self.receiver.as_ref()?;
        let result = match receiver.try_recv() {
            Ok(result) => result,
            Err(TryRecvError::Empty) => return None,
            Err(TryRecvError::Disconnected) => {
                Err(DirError::LoadingFailed("Loader stopped without a result".into()))
            }
        };
        self.receiver = None;
        Some(result)
    }
}

/// Runs `loader` once on the rayon pool.
pub fn spawn_load<L: DataLoader>(loader: L) -> PendingLoad {
    let (sender, receiver) = mpsc::channel();
    rayon::spawn(move || {
        let result = loader.load();
        if let Err(e) = &result {
            error!("Loading data failed: {e}");
            debug!("{}", SpanTrace::capture());
        }
        // The receiver is gone when the app quit before the load finished.
        let _ = sender.send(result);
    });
    PendingLoad {
        receiver: Some(receiver),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn fixture(name: &str) -> PathBuf {
        Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("tests/fixtures")
            .join(name)
    }

    fn wait(mut pending: PendingLoad) -> Result<Vec<Record>, DirError> {
        for _ in 0..500 {
            if let Some(result) = pending.poll() {
                assert!(pending.receiver.is_none());
                assert!(pending.poll().is_none());
                return result;
            }
            std::thread::sleep(Duration::from_millis(10));
        }
        panic!("load did not finish");
    }

    struct FailingLoader;

    impl DataLoader for FailingLoader {
        fn load(&self) -> Result<Vec<Record>, DirError> {
            Err(DirError::LoadingFailed("network unreachable".into()))
        }
    }

    #[test]
    fn loads_json_fixture() {
        let records = FileLoader::new(fixture("companies.json")).load().unwrap();
        assert_eq!(records.len(), 12);
        assert_eq!(records[0], Record::new("1", "Acme", "NY", "Tech"));
        assert_eq!(records[1].name, "Ball Co");
    }

    #[test]
    fn loads_csv_fixture() {
        let records = FileLoader::new(fixture("companies.csv")).load().unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(records[2], Record::new("3", "Cadence", "NY", "Tech"));
    }

    #[test]
    fn csv_text_is_kept_verbatim() {
        let records = FileLoader::new(fixture("numeric_text.csv")).load().unwrap();
        assert_eq!(records[0], Record::new("007", "1.50", "NY", "Tech"));
        assert_eq!(records[1].id, "010");
        assert_eq!(records[1].name, "3M");
    }

    #[test]
    fn missing_column_fails_the_load() {
        let err = FileLoader::new(fixture("missing_industry.csv"))
            .load()
            .unwrap_err();
        assert!(matches!(err, DirError::MissingField(ref f) if f == "industry"));
    }

    #[test]
    fn file_errors_are_mapped() {
        let err = FileLoader::new(fixture("does_not_exist.json"))
            .load()
            .unwrap_err();
        assert!(matches!(err, DirError::FileNotFound));

        let err = FileLoader::new(fixture("")).load().unwrap_err();
        assert!(matches!(err, DirError::LoadingFailed(_)));

        assert_eq!(
            FileLoader::detect_file_type(Path::new("data.TXT")).unwrap_err().to_string(),
            "Unknown file type"
        );
        assert_eq!(
            FileLoader::detect_file_type(Path::new("data.Json")).unwrap(),
            FileType::JSON
        );
    }

    #[test]
    fn spawned_load_resolves_once() {
        let records = wait(spawn_load(FileLoader::new(fixture("companies.csv")))).unwrap();
        assert_eq!(records.len(), 3);
    }

    #[test]
    fn spawned_failure_keeps_message() {
        let err = wait(spawn_load(FailingLoader)).unwrap_err();
        assert_eq!(err.to_string(), "network unreachable");
    }

    #[test]
    fn dropped_sender_is_a_failure() {
        let (sender, receiver) = mpsc::channel();
        drop(sender);
        let mut pending = PendingLoad {
            receiver: Some(receiver),
        };
        let err = pending.poll().unwrap().unwrap_err();
        assert!(matches!(err, DirError::LoadingFailed(_)));
        assert!(pending.receiver.is_none());
    }
}
