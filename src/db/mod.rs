pub mod banks;
pub mod prod_db;
pub mod table_store;
