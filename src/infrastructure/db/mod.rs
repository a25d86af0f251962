pub mod master;
pub mod report_store;
pub mod sqlite;

pub use master::MasterRepository;
pub use report_store::ReportStore;
pub use sqlite::Database;
