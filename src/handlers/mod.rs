pub mod auth;
pub mod campaigns;
pub mod contacts;
pub mod lookups;
pub mod messages;
pub mod templates;
pub mod tenants;
pub mod users;
pub mod whatsapp;
