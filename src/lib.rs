pub mod domain {
    pub mod entities {
        pub mod args;
        pub mod column;
        pub mod format;
        pub mod operator;
        pub mod query;
        pub mod record;
        pub mod settings;
    }

    pub mod filters {
        pub mod base;
        pub mod calendar;
        pub mod date;
        pub mod datetime;
        pub mod numeric;
        pub mod options;
        pub mod parse;
        pub mod text;
        pub mod time;
        pub mod yes_no;
    }
}

pub mod usecase {
    pub mod ports {
        pub mod host;
        pub mod session;
        pub mod source;
    }

    pub mod services {
        pub mod export_service;
        pub mod grid;
        pub mod qs_args;
    }
}

pub mod infra {
    pub mod export {
        pub mod csv;
        pub mod xlsx;
    }

    pub mod sqlite {
        pub mod queries;
        pub mod repo;
        pub mod schema;
    }
}

pub use domain::entities::args::QueryArgs;
pub use domain::entities::column::{
    Aggregate, CellValue, Column, ColumnError, ColumnFormat, RenderTarget,
};
pub use domain::entities::format::NumericFormat;
pub use domain::entities::operator::Op;
pub use domain::entities::query::{col, lit, raw, Dialect, Literal, Query};
pub use domain::entities::record::{Record, RecordSet};
pub use domain::entities::settings::{ExportFormat, GridSettings, Subtotals};
pub use domain::filters::base::{Filter, FilterConfig, FilterError};
pub use usecase::services::grid::{Grid, GridDefinition, GridError, GridManager};

#[cfg(test)]
mod tests;
