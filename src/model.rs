use arboard::Clipboard;
use ratatui::crossterm::event::KeyEvent;
use std::time::Instant;
use tracing::{debug, info, trace, warn};

use crate::domain::{
    DirConfig, DirError, HELP_TEXT, LoadStatus, Message, PAGE_SIZE, Record, SortKey,
};
use crate::inputter::{InputResult, Inputter};
use crate::pipeline::{self, Page};

#[derive(Debug, PartialEq)]
pub enum Status {
    RUNNING,
    QUITTING,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Modus {
    DIRECTORY,
    POPUP,
    CMDINPUT,
}

/// What the user picked. Everything else is derived from it and the catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewState {
    pub search_term: String,
    pub sort_key: SortKey,
    pub current_page: usize,
}

impl Default for ViewState {
    fn default() -> Self {
        Self {
            search_term: String::new(),
            sort_key: SortKey::None,
            current_page: 1,
        }
    }
}

/// Snapshot handed to the UI after every change.
pub struct UIData {
    pub title: String,
    pub load_status: LoadStatus,
    pub records: Vec<Record>,
    pub current_page: usize,
    pub total_pages: usize,
    pub has_previous: bool,
    pub has_next: bool,
    pub search_term: String,
    pub sort_key: SortKey,
    pub nmatches: usize,
    pub ncatalog: usize,
    pub max_column_width: usize,
    pub show_popup: bool,
    pub popup_message: String,
    pub cmdinput: InputResult,
    pub active_cmdinput: bool,
    pub status_message: String,
}

impl UIData {
    pub fn empty() -> Self {
        UIData {
            title: "Companies Directory".to_string(),
            load_status: LoadStatus::Loading,
            records: Vec::new(),
            current_page: 1,
            total_pages: 1,
            has_previous: false,
            has_next: false,
            search_term: String::new(),
            sort_key: SortKey::None,
            nmatches: 0,
            ncatalog: 0,
            max_column_width: 0,
            show_popup: false,
            popup_message: String::new(),
            cmdinput: InputResult::default(),
            active_cmdinput: false,
            status_message: String::new(),
        }
    }
}

/// Owns the catalog and the view state, and keeps the filter/sort/paginate
/// pipeline consistent. All mutation goes through [`Model::update`].
pub struct Model {
    config: DirConfig,
    pub status: Status,
    load_status: LoadStatus,
    modus: Modus,
    previous_modus: Modus,
    catalog: Vec<Record>,
    // Catalog indices of the filtered records in display order.
    rows: Vec<usize>,
    view: ViewState,
    input: Inputter,
    last_input: InputResult,
    clipboard: Option<Clipboard>,
    uidata: UIData,
    status_message: String,
}

impl Model {
    pub fn init(config: &DirConfig) -> Self {
        let mut model = Self {
            config: config.clone(),
            status: Status::RUNNING,
            load_status: LoadStatus::Loading,
            modus: Modus::DIRECTORY,
            previous_modus: Modus::DIRECTORY,
            catalog: Vec::new(),
            rows: Vec::new(),
            view: ViewState::default(),
            input: Inputter::default(),
            last_input: InputResult::default(),
            clipboard: None,
            uidata: UIData::empty(),
            status_message: "Loading ...".to_string(),
        };
        model.update_uidata();
        model
    }

    pub fn load_status(&self) -> &LoadStatus {
        &self.load_status
    }

    pub fn view_state(&self) -> &ViewState {
        &self.view
    }

    pub fn get_uidata(&self) -> &UIData {
        &self.uidata
    }

    pub fn raw_keyevents(&self) -> bool {
        self.modus == Modus::CMDINPUT
    }

    pub fn quit(&mut self) {
        self.status = Status::QUITTING;
    }

    /// Current page after clamping. Only meaningful once the catalog is loaded.
    pub fn page(&self) -> Page {
        pipeline::paginate(self.rows.len(), self.view.current_page, PAGE_SIZE)
    }

    /// Filtered records in display order, `None` until the catalog is loaded.
    pub fn ordered_records(&self) -> Option<Vec<&Record>> {
        self.is_ready()
            .then(|| self.rows.iter().map(|&idx| &self.catalog[idx]).collect())
    }

    /// Records on the current page, `None` until the catalog is loaded.
    pub fn visible_records(&self) -> Option<Vec<&Record>> {
        if !self.is_ready() {
            return None;
        }
        let page = self.page();
        Some(
            self.rows[page.window]
                .iter()
                .map(|&idx| &self.catalog[idx])
                .collect(),
        )
    }

    fn is_ready(&self) -> bool {
        self.load_status == LoadStatus::Ready
    }

    pub fn update(&mut self, message: Message) {
        trace!("Update: Modus {:?}, Message {:?}", self.modus, message);
        match message {
            Message::Loaded(result) => return self.finish_loading(result),
            Message::Quit => return self.quit(),
            Message::Resize(width, height) => {
                trace!("UI was resized to w:{width}, h:{height}");
                return self.update_uidata();
            }
            _ => {}
        }

        match self.modus {
            Modus::DIRECTORY => match message {
                Message::Help => self.show_help(),
                Message::Exit => {}
                msg if !self.is_ready() => {
                    debug!("Ignoring {msg:?} while {:?}", self.load_status)
                }
                Message::Search => self.enter_cmd_mode(),
                Message::CycleSort => self.set_sort(self.view.sort_key.next()),
                Message::SetSort(key) => self.set_sort(key),
                Message::SetSearch(term) => self.set_search(term),
                Message::NextPage => self.next_page(),
                Message::PreviousPage => self.previous_page(),
                Message::CopyPage => self.copy_page(),
                _ => (),
            },
            Modus::POPUP => {
                if let Message::Exit | Message::Help = message {
                    self.close_popup()
                }
            }
            Modus::CMDINPUT => {
                if let Message::RawKey(key) = message {
                    self.raw_input(key)
                }
            }
        }
    }

    fn finish_loading(&mut self, result: Result<Vec<Record>, DirError>) {
        if self.load_status != LoadStatus::Loading {
            warn!(
                "Ignoring load result, status is already {:?}",
                self.load_status
            );
            return;
        }
        match result {
            Ok(records) => {
                info!("Catalog ready with {} records", records.len());
                self.rows = (0..records.len()).collect();
                self.catalog = records;
                self.view = ViewState::default();
                self.load_status = LoadStatus::Ready;
                self.set_status_message(format!("Loaded {} companies", self.catalog.len()));
            }
            Err(e) => {
                warn!("Catalog failed to load: {e}");
                self.load_status = LoadStatus::Failed(e.to_string());
                self.set_status_message("");
            }
        }
        self.update_uidata();
    }

    // -------------------- Pipeline operations ---------------------- //

    fn set_search(&mut self, term: String) {
        let start_time = Instant::now();
        // Always derived from the whole catalog, the sort key is not reapplied.
        self.rows = pipeline::filter(&self.catalog, &term);
        self.view.search_term = term;
        self.view.current_page = 1;
        trace!(
            "Filter {:?} matched {} records in {}us",
            self.view.search_term,
            self.rows.len(),
            start_time.elapsed().as_micros()
        );
        self.set_status_message(format!("{} matches", self.rows.len()));
        self.update_uidata();
    }

    fn set_sort(&mut self, key: SortKey) {
        self.view.sort_key = key;
        self.rows = pipeline::sort(&self.catalog, &self.rows, key);
        self.view.current_page = self.page().current;
        trace!("Sorted {} rows by {:?}", self.rows.len(), key);
        self.update_uidata();
    }

    fn next_page(&mut self) {
        let page = self.page();
        self.view.current_page = pipeline::clamp_page(page.current + 1, page.total);
        self.update_uidata();
    }

    fn previous_page(&mut self) {
        let page = self.page();
        self.view.current_page = pipeline::clamp_page(page.current.saturating_sub(1), page.total);
        self.update_uidata();
    }

    // -------------------- Control handling functions ---------------------- //

    fn show_help(&mut self) {
        self.previous_modus = self.modus;
        self.modus = Modus::POPUP;
        self.update_uidata();
    }

    fn close_popup(&mut self) {
        trace!("Close popup ...");
        self.modus = self.previous_modus;
        self.previous_modus = Modus::POPUP;
        self.update_uidata();
    }

    fn enter_cmd_mode(&mut self) {
        trace!("Entering search input ...");
        self.previous_modus = self.modus;
        self.modus = Modus::CMDINPUT;
        self.input.set(&self.view.search_term);
        self.last_input = self.input.get();
        self.update_uidata();
    }

    fn raw_input(&mut self, key: KeyEvent) {
        self.last_input = self.input.read(key);
        if self.last_input.changed {
            self.set_search(self.last_input.input.clone());
        }
        if self.last_input.finished {
            trace!("Search input finished with {:?}", self.last_input.input);
            self.modus = self.previous_modus;
            self.previous_modus = Modus::CMDINPUT;
        }
        self.update_uidata();
    }

    fn wrap_cell_content(c: &str) -> String {
        let needs_escaping = c.contains('"');
        let needs_wrapping = c.chars().any(|c| c == ' ' || c == '\t' || c == ',');
        let mut out = String::from(c);

        if needs_escaping {
            out = out.replace('"', "\"\"");
        }
        if needs_escaping || needs_wrapping {
            out = format!("\"{out}\"");
        }
        out
    }

    /// Visible page as CSV lines of name, location and industry.
    pub fn page_as_csv(&self) -> String {
        self.visible_records()
            .unwrap_or_default()
            .iter()
            .map(|r| {
                [&r.name, &r.location, &r.industry]
                    .map(|c| Self::wrap_cell_content(c))
                    .join(",")
            })
            .collect::<Vec<String>>()
            .join("\n")
    }

    fn copy_page(&mut self) {
        let content = self.page_as_csv();
        if self.clipboard.is_none() {
            match Clipboard::new() {
                Ok(clipboard) => self.clipboard = Some(clipboard),
                Err(e) => {
                    warn!("Clipboard is not available: {e:?}");
                    self.set_status_message("Clipboard is not available");
                    return self.update_uidata();
                }
            }
        }
        if let Some(clipboard) = self.clipboard.as_mut() {
            match clipboard.set_text(content) {
                Ok(_) => {
                    trace!("Copied page to clipboard.");
                    self.set_status_message("Copied page to clipboard");
                }
                Err(e) => {
                    trace!("Error copying to clipboard: {:?}", e);
                    self.set_status_message("Copy to clipboard failed");
                }
            }
        }
        self.update_uidata();
    }

    fn set_status_message(&mut self, message: impl Into<String>) {
        self.status_message = message.into();
    }

    fn update_uidata(&mut self) {
        let page = self.page();
        self.uidata = UIData {
            title: "Companies Directory".to_string(),
            load_status: self.load_status.clone(),
            records: self
                .visible_records()
                .unwrap_or_default()
                .into_iter()
                .cloned()
                .collect(),
            current_page: page.current,
            total_pages: page.total,
            has_previous: page.has_previous(),
            has_next: page.has_next(),
            search_term: self.view.search_term.clone(),
            sort_key: self.view.sort_key,
            nmatches: self.rows.len(),
            ncatalog: self.catalog.len(),
            max_column_width: self.config.max_column_width,
            show_popup: self.modus == Modus::POPUP,
            popup_message: HELP_TEXT.to_string(),
            cmdinput: self.last_input.clone(),
            active_cmdinput: self.modus == Modus::CMDINPUT,
            status_message: self.status_message.clone(),
        };
    }
}
