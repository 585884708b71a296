use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug)]
pub struct Health {
    pub status: &'static str,
}

/// Body of every failed admin request.
#[derive(Serialize, Debug)]
pub struct ErrorBody {
    pub error: &'static str,
    pub message: String,
}
