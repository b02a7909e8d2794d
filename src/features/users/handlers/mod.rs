pub mod user_handler;

pub use user_handler::{
    __path_admin_update_user, __path_delete_user, __path_get_profile, admin_update_user,
    delete_user, get_profile,
};
