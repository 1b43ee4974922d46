use proptest::prelude::*;
use reservation_engine::model::{ClaimId, ProductId, StockRecord};

#[derive(Debug, Clone)]
enum Op {
    AdjustHeld(i64),
    AdjustReserved(i64),
    Refresh(u32),
    SetHold(usize, u32),
    TrySetHold(usize, u32),
    Transfer(usize, usize, u32),
    SetReservation(usize, u32),
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (-1_000i64..1_000).prop_map(Op::AdjustHeld),
        (-1_000i64..1_000).prop_map(Op::AdjustReserved),
        (0u32..500).prop_map(Op::Refresh),
        (0usize..4, 0u32..200).prop_map(|(c, u)| Op::SetHold(c, u)),
        (0usize..4, 0u32..200).prop_map(|(c, u)| Op::TrySetHold(c, u)),
        (0usize..4, 0usize..4, 0u32..200).prop_map(|(h, r, u)| Op::Transfer(h, r, u)),
        (0usize..4, 0u32..200).prop_map(|(c, u)| Op::SetReservation(c, u)),
    ]
}

proptest! {
    #[test]
    fn counters_never_go_negative_and_formulas_hold(ops in prop::collection::vec(op(), 1..60)) {
        let holds: Vec<ClaimId> = (0..4).map(|_| ClaimId::new()).collect();
        let reservations: Vec<ClaimId> = (0..4).map(|_| ClaimId::new()).collect();
        let mut record = StockRecord::new(ProductId(1), 100);

        for op in ops {
            match op {
                Op::AdjustHeld(delta) => { record.adjust_held(delta); }
                Op::AdjustReserved(delta) => { record.adjust_reserved(delta); }
                Op::Refresh(quantity) => record.refresh_external(quantity),
                Op::SetHold(c, units) => { record.set_hold(holds[c], units); }
                Op::TrySetHold(c, units) => { let _ = record.try_set_hold(holds[c], units); }
                Op::Transfer(h, r, units) => { record.transfer_hold(Some(holds[h]), reservations[r], units); }
                Op::SetReservation(c, units) => { record.set_reservation(reservations[c], units); }
            }

            let levels = record.levels();
            let sellable = i64::from(levels.external_sellable);
            let held = i64::from(levels.held);
            let reserved = i64::from(levels.reserved);
            prop_assert_eq!(i64::from(levels.available), (sellable - reserved - held).max(0));
            prop_assert_eq!(i64::from(levels.display), (sellable - reserved).max(0));
        }
    }

    #[test]
    fn hold_then_release_restores_available(sellable in 0u32..500, units in 0u32..500) {
        let mut record = StockRecord::new(ProductId(1), sellable);
        let before = record.available();
        let claim = ClaimId::new();

        if record.try_set_hold(claim, units).is_ok() {
            prop_assert_eq!(record.held(), units);
        }
        record.set_hold(claim, 0);
        record.set_hold(claim, 0);

        prop_assert_eq!(record.available(), before);
        prop_assert_eq!(record.held(), 0);
    }
}
