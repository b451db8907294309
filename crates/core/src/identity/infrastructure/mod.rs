pub mod sqlite_identity_store;
