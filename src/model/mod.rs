mod backend;
mod index;
mod query;
mod result;
mod workload;

pub use backend::{Backend, DbSize};
pub use index::{IndexKind, IndexSpec};
pub use query::{Query, QueryCatalog, QueryType};
pub use result::{CacheInfo, IndexInfo, RunResult, SingleQueryResult, WorkloadResult};
pub use workload::{Workload, WorkloadCatalog, WorkloadQuery, WorkloadType, execution_count};
