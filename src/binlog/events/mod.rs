// Copyright (c) 2021 Anatoly Ikorsky
//
// Licensed under the Apache License, Version 2.0
// <LICENSE-APACHE or http://www.apache.org/licenses/LICENSE-2.0> or the MIT
// license <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. All files in the project carrying such notice may not be copied,
// modified, or distributed except according to those terms.

//! Decoders of individual event bodies.

mod format_description_event;
mod load_query_events;
mod mariadb_events;
mod query_event;
mod rotate_event;
mod rows_event;
mod rows_query_event;
mod table_map_event;
mod xid_event;

pub use self::format_description_event::{FormatDescriptionEvent, RawServerVersion};
pub use self::load_query_events::{BeginLoadQueryEvent, ExecuteLoadQueryEvent};
pub use self::mariadb_events::{
    AnnotateRowsEvent, BinlogCheckpointEvent, MariadbGtid, MariadbGtidEvent, MariadbGtidListEvent,
};
pub use self::query_event::QueryEvent;
pub use self::rotate_event::RotateEvent;
pub use self::rows_event::{BinlogRow, RowsEvent, RowsEventKind, RowsEventSpec};
pub use self::rows_query_event::RowsQueryEvent;
pub use self::table_map_event::{OptionalMetadataFieldType, TableMapEvent};
pub use self::xid_event::XidEvent;
