pub use component::ComponentKind;
pub use credits::Credits;
pub use error::EngineError;
pub use export::{DashboardExporter, EXPORT_DIR_NAME, ExportFormat, ExportRequest, ExportResult};
pub use files::{FileCategory, FileInfo, FileService};
pub use layouts::{GRID_COLUMNS, LayoutConfiguration, LayoutItem};
pub use ops::{
    DownloadReceipt, Engine, EngineBuilder, SUPPORT_PAGE_SIZE, SupportListParams, SupportPage,
    SupportSort, UsageLicense, parse_threshold,
};
pub use packs::{PackListing, PackStatus, PricingMode, validate_pricing};
pub use probe::{DataProbe, DataSourceCatalog, FileCatalog, JsonFileCatalog};
pub use settings::DEFAULT_SUPPORT_THRESHOLD;
pub use storefronts::Storefront;
pub use support_requests::{SupportAction, SupportRequest, SupportStatus};
pub use transactions::{CreditsTransaction, TransactionType};
pub use users::User;

mod component;
mod credits;
mod error;
mod export;
mod files;
mod layouts;
mod ops;
mod packs;
mod probe;
mod settings;
mod storefronts;
mod support_requests;
mod transactions;
mod users;

pub type ResultEngine<T> = Result<T, EngineError>;
