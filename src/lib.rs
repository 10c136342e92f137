// SCHEDBENCH LIBRARY
// PURE PARSING/NORMALIZATION PLUS THE SWEEP MACHINERY, EXPOSED FOR THE
// BINARY AND FOR OFFLINE INTEGRATION TESTS (NO ROOT, NO EXTERNAL TOOLS)

pub mod extract;
pub mod invoke;
pub mod perf;
pub mod record;
pub mod sweep;
pub mod table;
pub mod tunables;
pub mod workload;
