pub mod category;
pub mod conflict;
pub mod dedupe;
pub mod hash;
pub mod paths;
pub mod scan;
pub mod status;
pub mod transfer;
