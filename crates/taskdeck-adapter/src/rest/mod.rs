/*
[INPUT]:  Backend HTTP client and table names
[OUTPUT]: Typed row-store clients
[POS]:    Rest layer - row CRUD over the hosted REST interface
[UPDATE]: When adding clients for new tables
*/

pub mod tasks;

pub use tasks::TaskTable;
