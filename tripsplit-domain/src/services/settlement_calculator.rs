use std::cmp::Reverse;

use crate::model::{
    Balance, BalanceAccumulator, MemberBalances, Money, Payment, Settlement, Split, UserId,
};

/// Band within which a net position counts as settled and is excluded from
/// matching. One cent: anything smaller is formatting residue, not debt.
pub const DEFAULT_SETTLED_TOLERANCE: Money = Money::from_cents(1);

/// Turns a net-position table into directed transfers.
///
/// The greedy matcher below is the production strategy; an exact
/// minimum-transaction solver can replace it without touching accumulation
/// or classification.
pub trait SettlementStrategy: Send + Sync {
    fn construct_transfers(&self, balances: &MemberBalances) -> Vec<Balance>;
}

/// Greedy largest-against-largest matching.
///
/// Debtors are visited most-negative first, creditors largest first; each
/// pair exchanges the smaller of the two open magnitudes. Deterministic:
/// stable sorts over the id-ordered balance table break ties by `UserId`.
#[derive(Clone, Copy, Debug)]
pub struct GreedySettlement {
    settled_tolerance: Money,
}

struct OpenPosition {
    user: UserId,
    cents: i64,
}

impl GreedySettlement {
    pub const fn new() -> Self {
        Self {
            settled_tolerance: DEFAULT_SETTLED_TOLERANCE,
        }
    }

    pub const fn with_tolerance(settled_tolerance: Money) -> Self {
        Self { settled_tolerance }
    }
}

impl Default for GreedySettlement {
    fn default() -> Self {
        Self::new()
    }
}

impl SettlementStrategy for GreedySettlement {
    fn construct_transfers(&self, balances: &MemberBalances) -> Vec<Balance> {
        let tolerance = self.settled_tolerance.cents();

        let mut debtors: Vec<OpenPosition> = Vec::new();
        let mut creditors: Vec<OpenPosition> = Vec::new();
        for (&user, &balance) in balances {
            let cents = balance.cents();
            if cents < -tolerance {
                debtors.push(OpenPosition { user, cents });
            } else if cents > tolerance {
                creditors.push(OpenPosition { user, cents });
            }
        }

        debtors.sort_by_key(|position| position.cents);
        creditors.sort_by_key(|position| Reverse(position.cents));

        tracing::debug!(
            member_count = balances.len(),
            debtor_count = debtors.len(),
            creditor_count = creditors.len(),
            "Settlement matching started"
        );

        let mut transfers = Vec::new();
        let mut i = 0;
        let mut j = 0;
        while i < debtors.len() && j < creditors.len() {
            let transfer = debtors[i].cents.abs().min(creditors[j].cents);
            if transfer > 0 {
                transfers.push(Balance {
                    from: debtors[i].user,
                    to: creditors[j].user,
                    amount: Money::from_cents(transfer),
                });
                debtors[i].cents += transfer;
                creditors[j].cents -= transfer;
            }

            // Checked independently: a transfer that zeroes both sides must
            // advance both pointers in the same iteration.
            if debtors[i].cents == 0 {
                i += 1;
            }
            if creditors[j].cents == 0 {
                j += 1;
            }
        }

        let dropped_residue_cents: i64 = debtors[i..].iter().map(|p| p.cents.abs()).sum::<i64>()
            + creditors[j..].iter().map(|p| p.cents).sum::<i64>();
        tracing::debug!(
            transfer_count = transfers.len(),
            dropped_residue_cents,
            "Settlement matching finished"
        );

        transfers
    }
}

static GREEDY: GreedySettlement = GreedySettlement::new();

/// Computes a trip's settlement from a snapshot of its splits and payment
/// ledger: accumulate net positions, classify, construct transfers.
#[derive(Clone, Copy)]
pub struct SettlementCalculator<'a> {
    strategy: &'a dyn SettlementStrategy,
}

impl<'a> SettlementCalculator<'a> {
    pub fn new(strategy: &'a dyn SettlementStrategy) -> Self {
        Self { strategy }
    }

    /// Calculator backed by the default greedy strategy.
    pub fn greedy() -> SettlementCalculator<'static> {
        SettlementCalculator { strategy: &GREEDY }
    }

    /// Nets every split against the approved payment ledger and reduces the
    /// result to suggested transfers.
    ///
    /// Pure over its inputs; malformed records produce best-effort output
    /// rather than errors.
    pub fn settle(&self, splits: &[Split], payments: &[Payment]) -> Settlement {
        tracing::debug!(
            split_count = splits.len(),
            payment_count = payments.len(),
            "Settlement computation started"
        );

        let mut accumulator = BalanceAccumulator::new();
        accumulator.apply_all(splits, payments);
        let balances = accumulator.into_balances();
        let transfers = self.strategy.construct_transfers(&balances);

        Settlement {
            balances,
            transfers,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{
        PaymentId, PaymentState, PaymentStatus, SplitId, SplitKind, SplitMember, TripId,
    };
    use chrono::Utc;
    use rstest::rstest;

    const A: UserId = UserId(1);
    const B: UserId = UserId(2);
    const C: UserId = UserId(3);
    const D: UserId = UserId(4);

    fn split(id: u64, creator: UserId, members: &[(UserId, i64)]) -> Split {
        let members: Vec<SplitMember> = members
            .iter()
            .map(|(user, cents)| SplitMember::new(*user, Money::from_cents(*cents)))
            .collect();
        let total: Money = members.iter().map(|member| member.amount).sum();
        Split {
            id: SplitId(id),
            trip_id: TripId(1),
            name: format!("split {id}"),
            total_amount: total,
            bill_amount: total,
            tax_amount: Money::ZERO,
            kind: SplitKind::Equal,
            creator_id: creator,
            members,
            items: None,
            created_at: Utc::now(),
        }
    }

    fn payment(id: u64, split_id: u64, payer: UserId, cents: i64, state: PaymentState) -> Payment {
        Payment {
            id: PaymentId(id),
            split_id: SplitId(split_id),
            payer_id: payer,
            amount: Money::from_cents(cents),
            state,
            created_at: Utc::now(),
        }
    }

    #[rstest]
    #[case::single_pair(
        MemberBalances::from_iter([(A, Money::from_cents(3000)), (B, Money::from_cents(-3000))]),
        vec![(B, A, 3000)]
    )]
    #[case::one_creditor_two_debtors(
        MemberBalances::from_iter([
            (A, Money::from_cents(6000)),
            (B, Money::from_cents(-3000)),
            (C, Money::from_cents(-3000)),
        ]),
        vec![(B, A, 3000), (C, A, 3000)]
    )]
    #[case::largest_debtor_matched_first(
        MemberBalances::from_iter([
            (A, Money::from_cents(5000)),
            (B, Money::from_cents(-1000)),
            (C, Money::from_cents(-4000)),
        ]),
        vec![(C, A, 4000), (B, A, 1000)]
    )]
    #[case::largest_creditor_matched_first(
        MemberBalances::from_iter([
            (A, Money::from_cents(1500)),
            (B, Money::from_cents(4500)),
            (C, Money::from_cents(-6000)),
        ]),
        vec![(C, B, 4500), (C, A, 1500)]
    )]
    #[case::tie_breaks_by_user_id(
        MemberBalances::from_iter([
            (B, Money::from_cents(-2000)),
            (A, Money::from_cents(-2000)),
            (C, Money::from_cents(4000)),
        ]),
        vec![(A, C, 2000), (B, C, 2000)]
    )]
    #[case::cent_residue_dropped(
        MemberBalances::from_iter([(A, Money::from_cents(1)), (B, Money::from_cents(-1))]),
        vec![]
    )]
    #[case::all_settled(
        MemberBalances::from_iter([(A, Money::ZERO), (B, Money::ZERO)]),
        vec![]
    )]
    #[case::empty_table(MemberBalances::new(), vec![])]
    fn greedy_matching_cases(
        #[case] balances: MemberBalances,
        #[case] expected: Vec<(UserId, UserId, i64)>,
    ) {
        let transfers = GreedySettlement::new().construct_transfers(&balances);

        let expected: Vec<Balance> = expected
            .into_iter()
            .map(|(from, to, cents)| Balance {
                from,
                to,
                amount: Money::from_cents(cents),
            })
            .collect();
        assert_eq!(transfers, expected);
    }

    #[test]
    fn wider_tolerance_widens_the_settled_band() {
        let balances = MemberBalances::from_iter([
            (A, Money::from_cents(500)),
            (B, Money::from_cents(-500)),
        ]);

        let strategy = GreedySettlement::with_tolerance(Money::from_cents(500));
        assert_eq!(strategy.construct_transfers(&balances), vec![]);
    }

    #[test]
    fn exact_cross_zero_advances_both_pointers() {
        // B's debt exactly matches A's credit; C and D form a second pair
        // that must still be matched after both pointers advance together.
        let balances = MemberBalances::from_iter([
            (A, Money::from_cents(5000)),
            (B, Money::from_cents(-5000)),
            (C, Money::from_cents(1200)),
            (D, Money::from_cents(-1200)),
        ]);

        let transfers = GreedySettlement::new().construct_transfers(&balances);
        assert_eq!(
            transfers,
            vec![
                Balance {
                    from: B,
                    to: A,
                    amount: Money::from_cents(5000),
                },
                Balance {
                    from: D,
                    to: C,
                    amount: Money::from_cents(1200),
                },
            ]
        );
    }

    #[test]
    fn equal_split_among_three_with_creator_member() {
        // 90.00 split equally by A among A, B, C: A nets +60.00.
        let splits = vec![split(1, A, &[(A, 3000), (B, 3000), (C, 3000)])];

        let settlement = SettlementCalculator::greedy().settle(&splits, &[]);

        assert_eq!(settlement.balances.get(&A), Some(&Money::from_cents(6000)));
        assert_eq!(settlement.balances.get(&B), Some(&Money::from_cents(-3000)));
        assert_eq!(settlement.balances.get(&C), Some(&Money::from_cents(-3000)));
        assert_eq!(
            settlement.transfers,
            vec![
                Balance {
                    from: B,
                    to: A,
                    amount: Money::from_cents(3000),
                },
                Balance {
                    from: C,
                    to: A,
                    amount: Money::from_cents(3000),
                },
            ]
        );
    }

    #[test]
    fn approved_partial_payment_reduces_debt() {
        let splits = vec![split(1, A, &[(B, 5000)])];
        let payments = vec![payment(1, 1, B, 2000, PaymentState::Approved)];

        let settlement = SettlementCalculator::greedy().settle(&splits, &payments);
        assert_eq!(
            settlement.transfers,
            vec![Balance {
                from: B,
                to: A,
                amount: Money::from_cents(3000),
            }]
        );
    }

    #[test]
    fn multiple_approved_payments_accumulate() {
        let splits = vec![split(1, A, &[(B, 5000)])];
        let payments = vec![
            payment(1, 1, B, 2000, PaymentState::Approved),
            payment(2, 1, B, 1500, PaymentState::Approved),
        ];

        let settlement = SettlementCalculator::greedy().settle(&splits, &payments);
        assert_eq!(
            settlement.transfers,
            vec![Balance {
                from: B,
                to: A,
                amount: Money::from_cents(1500),
            }]
        );
    }

    #[test]
    fn pending_and_rejected_payments_do_not_count() {
        let splits = vec![split(1, A, &[(B, 5000)])];
        let payments = vec![
            payment(1, 1, B, 2000, PaymentState::Pending),
            payment(2, 1, B, 1000, PaymentState::Rejected),
        ];

        let settlement = SettlementCalculator::greedy().settle(&splits, &payments);
        assert_eq!(
            settlement.transfers,
            vec![Balance {
                from: B,
                to: A,
                amount: Money::from_cents(5000),
            }]
        );
    }

    #[test]
    fn payments_against_other_splits_do_not_count() {
        let splits = vec![split(1, A, &[(B, 5000)]), split(2, A, &[(B, 1000)])];
        let payments = vec![payment(1, 2, B, 1000, PaymentState::Approved)];

        let settlement = SettlementCalculator::greedy().settle(&splits, &payments);
        assert_eq!(
            settlement.transfers,
            vec![Balance {
                from: B,
                to: A,
                amount: Money::from_cents(5000),
            }]
        );
    }

    #[test]
    fn approved_status_overrides_payment_ledger() {
        // The member's share is marked approved with no ledger rows at all:
        // the debt is treated as fully settled. Legacy behavior, kept as is.
        let mut splits = vec![split(1, A, &[(B, 4000)])];
        splits[0].members[0].status = PaymentStatus::Approved;

        let settlement = SettlementCalculator::greedy().settle(&splits, &[]);
        assert_eq!(settlement.transfers, vec![]);
        assert_eq!(settlement.balances.get(&A), Some(&Money::ZERO));
        assert_eq!(settlement.balances.get(&B), Some(&Money::ZERO));
    }

    #[test]
    fn overpayment_flips_direction() {
        let splits = vec![split(1, A, &[(B, 3000)])];
        let payments = vec![payment(1, 1, B, 5000, PaymentState::Approved)];

        let settlement = SettlementCalculator::greedy().settle(&splits, &payments);
        assert_eq!(
            settlement.transfers,
            vec![Balance {
                from: A,
                to: B,
                amount: Money::from_cents(2000),
            }]
        );
    }

    #[test]
    fn debts_net_across_splits() {
        // A fronted 40.00 for B; B fronted 15.00 for A. Net: B pays 25.00.
        let splits = vec![
            split(1, A, &[(B, 4000)]),
            split(2, B, &[(A, 1500)]),
        ];

        let settlement = SettlementCalculator::greedy().settle(&splits, &[]);
        assert_eq!(
            settlement.transfers,
            vec![Balance {
                from: B,
                to: A,
                amount: Money::from_cents(2500),
            }]
        );
    }

    #[test]
    fn no_self_transfers_emitted() {
        let splits = vec![
            split(1, A, &[(A, 2500), (B, 2500)]),
            split(2, B, &[(A, 1000), (B, 3000)]),
        ];

        let settlement = SettlementCalculator::greedy().settle(&splits, &[]);
        assert!(settlement.transfers.iter().all(|t| t.from != t.to));
    }

    #[test]
    fn settle_is_idempotent_over_the_same_snapshot() {
        let splits = vec![
            split(1, A, &[(A, 3334), (B, 3333), (C, 3333)]),
            split(2, C, &[(B, 1200), (D, 2200)]),
        ];
        let payments = vec![payment(1, 2, B, 700, PaymentState::Approved)];

        let calculator = SettlementCalculator::greedy();
        let first = calculator.settle(&splits, &payments);
        let second = calculator.settle(&splits, &payments);
        assert_eq!(first, second);
    }
}
