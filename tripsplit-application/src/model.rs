use tripsplit_domain::{Balance, Money, UserId};

use crate::ports::MemberDirectory;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PersonBalance {
    pub id: UserId,
    pub balance: Money,
}

/// Net positions and suggested transfers for one trip, id-sorted.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TripSettlement {
    pub balances: Vec<PersonBalance>,
    pub transfers: Vec<Balance>,
}

impl TripSettlement {
    /// One payment-request line per suggested transfer, for the messaging
    /// layer. Users missing from the directory are shown by id.
    pub fn notices(&self, directory: &dyn MemberDirectory) -> Vec<String> {
        self.transfers
            .iter()
            .map(|transfer| {
                let from = display(directory, transfer.from);
                let to = display(directory, transfer.to);
                format!("{from} pays {to} {}", transfer.amount)
            })
            .collect()
    }
}

fn display(directory: &dyn MemberDirectory, user: UserId) -> String {
    match directory.display_name(user) {
        Some(name) => name.to_string(),
        None => format!("user {user}"),
    }
}

/// One user's "you owe / owed to you" view of a trip.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MemberPosition {
    pub user: UserId,
    pub net: Money,
    pub owes: Vec<Balance>,
    pub owed: Vec<Balance>,
}

impl MemberPosition {
    pub fn is_settled(&self) -> bool {
        self.owes.is_empty() && self.owed.is_empty()
    }

    pub fn total_owing(&self) -> Money {
        self.owes.iter().map(|transfer| transfer.amount).sum()
    }

    pub fn total_incoming(&self) -> Money {
        self.owed.iter().map(|transfer| transfer.amount).sum()
    }
}
