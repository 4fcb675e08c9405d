pub mod reconcile;
pub mod scan;
pub mod watch;

use crate::error::Result;

pub use reconcile::ReconcileCommand;
pub use scan::ScanCommand;
pub use watch::WatchCommand;

#[async_trait::async_trait]
pub trait Command {
    async fn execute(&self) -> Result<()>;
}
