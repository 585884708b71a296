use models::user::AdminType;
use uuid::Uuid;

/// The authenticated administrator a request runs on behalf of.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Actor {
    pub id: Uuid,
    pub username: String,
    pub admin_type: AdminType,
}

impl Actor {
    pub fn is_super_admin(&self) -> bool {
        self.admin_type == AdminType::SuperAdmin
    }
}
