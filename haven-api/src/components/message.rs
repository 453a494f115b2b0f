//! Decision audit messages, listed per addressed user.

use haven_core::Message;

use crate::component::Listable;

impl Listable for Message {
    const ENTITY_NAME: &'static str = "Message";
    const TABLE: &'static str = "\"Messages\"";
    const PK_FIELD: &'static str = "id_message";
    const SEARCH_FIELDS: &'static [&'static str] = &["message", "status"];
    const ORDER_FIELD: Option<&'static str> = Some("id_message");
}
