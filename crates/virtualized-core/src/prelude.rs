pub use crate::clock::{Clock, SystemClock, TestClock};
pub use crate::effects::{Dispose, effect, on_unmount};
pub use crate::error::{Error, Result};
pub use crate::geometry::Rect;
pub use crate::modifier::{Modifier, join_classes};
pub use crate::scheduler::{ManualScheduler, Scheduler, Task, TaskId};
pub use crate::scope::{Scope, current_scope, scoped_effect};
pub use crate::signal::{Signal, SubId, signal};
pub use crate::view::{View, ViewId, ViewKind, new_view_id};
