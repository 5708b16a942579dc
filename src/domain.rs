use std::fmt;
use std::io::Error;

use derive_setters::Setters;
use polars::error::PolarsError;
use ratatui::crossterm::event::KeyEvent;

/// Number of records shown on one page.
pub const PAGE_SIZE: usize = 5;

pub const HELP_TEXT: &str = "\
Companies Directory

  /            search by name, location or industry
  Enter        keep search term
  Esc          clear search term / close popup
  s            cycle sort: none -> name -> industry
  0 1 2        sort by none / name / industry
  Right l n    next page
  Left h p     previous page
  PgDn / PgUp  next / previous page
  y            copy current page to clipboard
  ?            show this help
  q            quit
";

/// One company entry. Immutable once loaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub id: String,
    pub name: String,
    pub location: String,
    pub industry: String,
}

impl Record {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        location: impl Into<String>,
        industry: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            location: location.into(),
            industry: industry.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortKey {
    #[default]
    None,
    Name,
    Industry,
}

impl SortKey {
    /// Order of the sort selector.
    pub fn next(self) -> Self {
        match self {
            SortKey::None => SortKey::Name,
            SortKey::Name => SortKey::Industry,
            SortKey::Industry => SortKey::None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            SortKey::None => "Sort by",
            SortKey::Name => "Name",
            SortKey::Industry => "Industry",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadStatus {
    Loading,
    Ready,
    Failed(String),
}

#[derive(Debug)]
pub enum Message {
    Quit,
    Help,
    Exit,
    Search,
    CycleSort,
    SetSort(SortKey),
    SetSearch(String),
    NextPage,
    PreviousPage,
    CopyPage,
    Resize(usize, usize),
    RawKey(KeyEvent),
    Loaded(Result<Vec<Record>, DirError>),
}

#[derive(Debug, Clone, Setters)]
pub struct DirConfig {
    pub event_poll_time: u64,
    pub max_column_width: usize,
}

impl Default for DirConfig {
    fn default() -> Self {
        Self {
            event_poll_time: 100,
            max_column_width: 40,
        }
    }
}

#[derive(Debug)]
pub enum DirError {
    IoError(Error),
    PolarsError(PolarsError),
    LoadingFailed(String),
    MissingField(String),
    FileNotFound,
    PermissionDenied,
    UnknownFileType,
}

impl fmt::Display for DirError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DirError::IoError(e) => write!(f, "{e}"),
            DirError::PolarsError(e) => write!(f, "{e}"),
            DirError::LoadingFailed(msg) => write!(f, "{msg}"),
            DirError::MissingField(field) => write!(f, "Record is missing field \"{field}\""),
            DirError::FileNotFound => write!(f, "File not found"),
            DirError::PermissionDenied => write!(f, "Permission denied"),
            DirError::UnknownFileType => write!(f, "Unknown file type"),
        }
    }
}

impl std::error::Error for DirError {}

impl From<Error> for DirError {
    fn from(err: Error) -> Self {
        DirError::IoError(err)
    }
}

impl From<PolarsError> for DirError {
    fn from(err: PolarsError) -> Self {
        DirError::PolarsError(err)
    }
}
