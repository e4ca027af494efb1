pub mod config;
pub mod db;
pub mod error;
pub mod routes;
pub mod state;

pub mod crypto {
    pub mod cipher;
    pub mod kdf;
    pub mod password;
    pub mod token;
}

pub mod models {
    pub mod entry;
    pub mod session;
    pub mod user;
}

pub mod repositories {
    pub mod entry;
    pub mod memory;
    pub mod session;
    pub mod traits;
    pub mod user;
}

pub mod services {
    pub mod auth;
    pub mod deadline;
    pub mod vault;
}

pub mod handlers {
    pub mod auth;
    pub mod entries;
}

pub mod middleware_layer {
    pub mod auth;
}

pub mod validation {
    pub mod auth;
}
