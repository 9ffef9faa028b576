use serde::{Deserialize, Serialize};

/// Which totals rows a grid computes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Subtotals {
    #[default]
    None,
    Page,
    Grand,
    All,
}

impl Subtotals {
    pub fn wants_page(self) -> bool {
        matches!(self, Subtotals::Page | Subtotals::All)
    }

    pub fn wants_grand(self) -> bool {
        matches!(self, Subtotals::Grand | Subtotals::All)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Xls,
    Xlsx,
    Csv,
}

impl ExportFormat {
    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "xls" => Some(ExportFormat::Xls),
            "xlsx" => Some(ExportFormat::Xlsx),
            "csv" => Some(ExportFormat::Csv),
            _ => None,
        }
    }

    pub fn key(self) -> &'static str {
        match self {
            ExportFormat::Xls => "xls",
            ExportFormat::Xlsx => "xlsx",
            ExportFormat::Csv => "csv",
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Xls | ExportFormat::Xlsx => "xlsx",
            ExportFormat::Csv => "csv",
        }
    }
}

fn default_per_page() -> Option<i64> {
    Some(50)
}

fn default_on_page() -> i64 {
    1
}

fn default_true() -> bool {
    true
}

fn default_max_sort_keys() -> usize {
    3
}

fn default_exports() -> Vec<ExportFormat> {
    vec![ExportFormat::Xls, ExportFormat::Xlsx, ExportFormat::Csv]
}

/// Per-grid behaviour switches; every field has a default so partial JSON works.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridSettings {
    #[serde(default = "default_per_page")]
    pub per_page: Option<i64>,
    #[serde(default = "default_on_page")]
    pub on_page: i64,
    #[serde(default = "default_true")]
    pub pager_on: bool,
    #[serde(default = "default_true")]
    pub sorter_on: bool,
    #[serde(default)]
    pub session_on: bool,
    #[serde(default)]
    pub subtotals: Subtotals,
    #[serde(default)]
    pub qs_prefix: String,
    #[serde(default = "default_max_sort_keys")]
    pub max_sort_keys: usize,
    #[serde(default = "default_exports")]
    pub allowed_exports: Vec<ExportFormat>,
    #[serde(default)]
    pub enable_search: bool,
}

impl Default for GridSettings {
    fn default() -> Self {
        Self {
            per_page: default_per_page(),
            on_page: default_on_page(),
            pager_on: true,
            sorter_on: true,
            session_on: false,
            subtotals: Subtotals::None,
            qs_prefix: String::new(),
            max_sort_keys: default_max_sort_keys(),
            allowed_exports: default_exports(),
            enable_search: false,
        }
    }
}

impl GridSettings {
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    pub fn allows_export(&self, format: ExportFormat) -> bool {
        self.allowed_exports.contains(&format)
    }
}
