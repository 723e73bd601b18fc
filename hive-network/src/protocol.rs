/// The external, on-the-wire Bitcoin protocol: messages, codec, and the
/// primitive types they're built from.
pub mod external;
