pub mod amqp;
pub mod redis;

pub use amqp::AmqpSink;
pub use redis::RedisSink;
