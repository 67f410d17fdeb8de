pub mod compact;
pub mod error;
pub mod params;
pub mod pow;
pub mod registry;
pub mod sha256;
pub mod types;

use serde::{Deserialize, Serialize};
use uint::construct_uint;

construct_uint! {
    // construct an unsigned 256-bit integer
    // 4 x 64bit
    #[derive(Serialize, Deserialize)]
    pub struct U256(4);
}
