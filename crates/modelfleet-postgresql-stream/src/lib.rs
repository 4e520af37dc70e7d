mod postgresql;

pub use postgresql::PostgresqlEventStream;
