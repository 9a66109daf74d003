//! Content-addressed storage helpers: CID extraction and gateway probing.

pub mod cid;
pub mod prober;

pub use cid::{extract_cid, gateway_url};
pub use prober::{GatewayProber, ProbeHit};
