//! Status helper enums mapping to SMALLSERIAL/SMALLINT lookup tables.
//!
//! Each enum variant's discriminant matches the seed data order (1-based)
//! in the corresponding `*_statuses` database table.

/// Status ID type matching SMALLINT/SMALLSERIAL in the database.
pub type StatusId = i16;

macro_rules! define_status_enum {
    (
        $(#[$meta:meta])*
        $name:ident {
            $( $(#[$vmeta:meta])* $variant:ident = $val:expr ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[repr(i16)]
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        pub enum $name {
            $( $(#[$vmeta])* $variant = $val ),+
        }

        impl $name {
            /// Return the database status ID.
            pub fn id(self) -> StatusId {
                self as StatusId
            }
        }

        impl From<$name> for StatusId {
            fn from(value: $name) -> Self {
                value as StatusId
            }
        }
    };
}

define_status_enum! {
    /// Workflow instance lifecycle status.
    InstanceStatus {
        InProgress = 1,
        Approved = 2,
        Rejected = 3,
        Cancelled = 4,
    }
}

impl InstanceStatus {
    /// Name as seeded in `workflow_instance_statuses`.
    pub fn name(self) -> &'static str {
        match self {
            InstanceStatus::InProgress => "in_progress",
            InstanceStatus::Approved => "approved",
            InstanceStatus::Rejected => "rejected",
            InstanceStatus::Cancelled => "cancelled",
        }
    }

    /// Map a raw `status_id` column value back to the enum.
    pub fn from_id(id: StatusId) -> Option<Self> {
        match id {
            1 => Some(InstanceStatus::InProgress),
            2 => Some(InstanceStatus::Approved),
            3 => Some(InstanceStatus::Rejected),
            4 => Some(InstanceStatus::Cancelled),
            _ => None,
        }
    }

    /// Parse a seeded status name (used by list query filters).
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "in_progress" => Some(InstanceStatus::InProgress),
            "approved" => Some(InstanceStatus::Approved),
            "rejected" => Some(InstanceStatus::Rejected),
            "cancelled" => Some(InstanceStatus::Cancelled),
            _ => None,
        }
    }

    /// Whether an instance in this status can still change.
    pub fn is_terminal(self) -> bool {
        !matches!(self, InstanceStatus::InProgress)
    }
}
