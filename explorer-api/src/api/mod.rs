//! HTTP API handlers for explorer-api

pub mod auth;
pub mod browse;
pub mod buildinfo;
pub mod health;
pub mod login;
pub mod reference;
pub mod upload;
pub mod users;

pub use auth::auth_middleware;
pub use browse::{
    get_biosample, get_participant, list_biosamples, list_participants, participant_biosamples,
};
pub use buildinfo::get_build_info;
pub use health::health_routes;
pub use login::{login, refresh};
pub use reference::{
    create_reference, delete_reference, get_reference, list_references, update_reference,
};
pub use upload::upload_csv;
pub use users::{create_user, list_users};
