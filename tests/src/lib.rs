#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use confidential_transfer::view::{reconstruct, NoteEvent, NoteEventKind};
    use confidential_transfer::{Account, AccountKey, LocalNotes};
    use confidential_transfer_lib::*;
    use quickcheck::TestResult;
    use quickcheck_macros::quickcheck;

    /// Deterministic factory: blinding is a running counter.
    struct SeqFactory(Cell<u64>);

    impl SeqFactory {
        fn new() -> Self {
            SeqFactory(Cell::new(0))
        }
    }

    impl NoteFactory for SeqFactory {
        fn create_note(&self, owner: &NotePublicKey, value: u64) -> Result<Note, RequestError> {
            let n = self.0.get();
            self.0.set(n + 1);
            let mut blinding = [0u8; 32];
            blinding[..8].copy_from_slice(&n.to_be_bytes());
            let hash = note_hash(value, owner, &blinding);
            Ok(Note {
                owner: *owner,
                value,
                public_id: hash.to_vec(),
                note_hash: hash,
            })
        }
    }

    fn key(byte: u8) -> NotePublicKey {
        NotePublicKey([byte; 32])
    }

    fn parties() -> Parties {
        Parties {
            sender: [0x11; 20],
            public_owner: [0x11; 20],
            validator: [0x33; 20],
        }
    }

    fn notes(factory: &SeqFactory, owner: NotePublicKey, values: &[u64]) -> Vec<Note> {
        values
            .iter()
            .map(|v| factory.create_note(&owner, *v).unwrap())
            .collect()
    }

    fn conserved(request: &TransferRequest) -> bool {
        sum_values(request.output_notes()) as i128 - sum_values(request.input_notes()) as i128
            + request.k_public()
            == 0
    }

    fn values(raw: &[u32]) -> Vec<u64> {
        raw.iter().map(|v| *v as u64).collect()
    }

    // =========================================================================
    //                              SCENARIOS
    // =========================================================================

    #[test]
    fn test_scenario_private_transfer_of_seven() {
        let factory = SeqFactory::new();
        let (sender, recipient) = (key(1), key(2));
        let candidates = notes(&factory, sender, &[5, 5, 8, 2]);

        let selection = select_notes(&candidates, 7).unwrap();
        assert_eq!(selection.notes, candidates[..2]);
        assert_eq!(selection.remainder, 3);

        let request = private_transfer(
            &factory,
            &selection,
            vec![sender; 2],
            &sender,
            &recipient,
            7,
            parties(),
        )
        .unwrap();
        let outputs: Vec<u64> = request.output_notes().iter().map(|n| n.value).collect();
        assert_eq!(outputs, [3, 7]);
        assert_eq!(request.output_notes()[1].owner, recipient);
        assert_eq!(request.k_public(), 0);
        assert!(conserved(&request));
    }

    #[test]
    fn test_scenario_mint_in_of_four_notes() {
        let factory = SeqFactory::new();
        let request = mint_in(&factory, &key(1), &[100, 100, 100, 100], parties()).unwrap();
        assert!(request.input_notes().is_empty());
        assert_eq!(request.output_notes().len(), 4);
        assert_eq!(request.k_public(), -400);
        assert_eq!(request.public_deposit(), Some(400));
    }

    #[test]
    fn test_scenario_insufficient_balance() {
        let factory = SeqFactory::new();
        let candidates = notes(&factory, key(1), &[1, 2, 3]);
        assert_eq!(
            select_notes(&candidates, 10),
            Err(SelectError::InsufficientBalance { need: 10, have: 6 })
        );
    }

    #[test]
    fn test_request_json_is_stable() {
        let factory = SeqFactory::new();
        let request = mint_in(&factory, &key(1), &[100], parties()).unwrap();
        let bytes = serde_json::to_vec(&request).unwrap();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(json["k_public"], -100);
        assert_eq!(json["output_notes"][0]["value"], 100);
        assert_eq!(bytes, serde_json::to_vec(&request.clone()).unwrap());
    }

    /// Notes created by one request are found on-ledger and spent by the next.
    #[test]
    fn test_minted_notes_become_spendable_inputs() {
        let alice = Account::from_key(AccountKey::from_bytes([0x21; 32])).unwrap();
        let bob = Account::from_key(AccountKey::from_bytes([0x22; 32])).unwrap();

        let minted = mint_in(&LocalNotes, alice.public_key(), &[40, 60], parties()).unwrap();
        let events: Vec<NoteEvent> = minted
            .output_notes()
            .iter()
            .enumerate()
            .map(|(i, note)| NoteEvent {
                block: 10,
                log_index: i as u64,
                note_hash: note.note_hash.into(),
                kind: NoteEventKind::Created {
                    metadata: note.public_id.clone().into(),
                },
            })
            .collect();

        let spendable = reconstruct(events, &LocalNotes, &alice);
        assert_eq!(spendable, minted.output_notes());

        let selection = select_notes(&spendable, 50).unwrap();
        let request = private_transfer(
            &LocalNotes,
            &selection,
            vec![*alice.public_key(); selection.notes.len()],
            alice.public_key(),
            bob.public_key(),
            50,
            parties(),
        )
        .unwrap();
        assert_eq!(request.input_notes(), minted.output_notes());
        assert!(conserved(&request));
        assert_eq!(hex::encode(request.input_notes()[0].note_hash).len(), 64);

        // Alice's transaction announces both outputs; Bob finds his payment
        // and Alice her change.
        let announced: Vec<NoteEvent> = request
            .output_notes()
            .iter()
            .enumerate()
            .map(|(i, note)| NoteEvent {
                block: 11,
                log_index: i as u64,
                note_hash: note.note_hash.into(),
                kind: NoteEventKind::Created {
                    metadata: note.public_id.clone().into(),
                },
            })
            .collect();
        let received = reconstruct(announced.clone(), &LocalNotes, &bob);
        assert_eq!(received.len(), 1);
        assert_eq!(received[0].value, 50);
        let change = reconstruct(announced, &LocalNotes, &alice);
        assert_eq!(change.iter().map(|n| n.value).collect::<Vec<_>>(), [50]);
    }

    // =========================================================================
    //                              PROPERTIES
    // =========================================================================

    #[quickcheck]
    fn selection_is_minimal_greedy_prefix(raw: Vec<u32>, target: u32) -> TestResult {
        if target == 0 {
            return TestResult::discard();
        }
        let factory = SeqFactory::new();
        let candidates = notes(&factory, key(1), &values(&raw));
        let available = sum_values(&candidates);
        let target = target as u64;

        match select_notes(&candidates, target) {
            Ok(selection) => {
                let total = sum_values(&selection.notes);
                let without_last = total - selection.notes.last().map_or(0, |n| n.value as u128);
                TestResult::from_bool(
                    available >= target as u128
                        && candidates.starts_with(&selection.notes)
                        && total >= target as u128
                        && without_last < target as u128
                        && selection.total == total
                        && selection.remainder as u128 == total - target as u128,
                )
            }
            Err(_) => TestResult::from_bool(available < target as u128),
        }
    }

    #[quickcheck]
    fn selection_fails_iff_balance_is_short(raw: Vec<u32>, target: u32) -> TestResult {
        if target == 0 {
            return TestResult::discard();
        }
        let factory = SeqFactory::new();
        let candidates = notes(&factory, key(1), &values(&raw));
        let have = sum_values(&candidates);
        let result = select_notes(&candidates, target as u64);
        if have < target as u128 {
            TestResult::from_bool(
                result == Err(SelectError::InsufficientBalance { need: target as u64, have }),
            )
        } else {
            TestResult::from_bool(result.is_ok())
        }
    }

    #[quickcheck]
    fn selection_is_idempotent(raw: Vec<u32>, target: u32) -> bool {
        let factory = SeqFactory::new();
        let candidates = notes(&factory, key(1), &values(&raw));
        select_notes(&candidates, target as u64) == select_notes(&candidates, target as u64)
    }

    #[quickcheck]
    fn private_transfers_conserve_value(raw: Vec<u32>, target: u32) -> TestResult {
        let factory = SeqFactory::new();
        let sender = key(1);
        let candidates = notes(&factory, sender, &values(&raw));
        let Ok(selection) = select_notes(&candidates, target as u64) else {
            return TestResult::discard();
        };
        let request = private_transfer(
            &factory,
            &selection,
            vec![sender; selection.notes.len()],
            &sender,
            &key(2),
            target as u64,
            parties(),
        );
        TestResult::from_bool(matches!(request, Ok(ref r) if conserved(r) && r.k_public() == 0))
    }

    #[quickcheck]
    fn redemptions_conserve_value(raw: Vec<u32>, target: u32) -> TestResult {
        let factory = SeqFactory::new();
        let owner = key(1);
        let candidates = notes(&factory, owner, &values(&raw));
        let Ok(selection) = select_notes(&candidates, target as u64) else {
            return TestResult::discard();
        };
        let request = redeem_out(
            &factory,
            &selection,
            vec![owner; selection.notes.len()],
            &owner,
            target as u64,
            parties(),
        );
        TestResult::from_bool(
            matches!(request, Ok(ref r) if conserved(r) && r.k_public() == target as i128),
        )
    }

    #[quickcheck]
    fn mint_in_draws_exact_sum(raw: Vec<u32>) -> TestResult {
        if raw.is_empty() {
            return TestResult::discard();
        }
        let factory = SeqFactory::new();
        let request = mint_in(&factory, &key(1), &values(&raw), parties()).unwrap();
        let sum: i128 = raw.iter().map(|v| *v as i128).sum();
        TestResult::from_bool(conserved(&request) && request.k_public() == -sum)
    }

    #[quickcheck]
    fn skewed_outputs_are_rejected(raw: Vec<u32>, skew: u32) -> TestResult {
        if raw.is_empty() || skew == 0 {
            return TestResult::discard();
        }
        let factory = SeqFactory::new();
        let owner = key(1);
        let inputs = notes(&factory, owner, &values(&raw));
        let total = sum_values(&inputs) as u64;
        let outputs = notes(&factory, owner, &[total + skew as u64]);
        let result = TransferRequest::new(RequestParts {
            input_notes: inputs.clone(),
            input_note_owners: vec![owner; inputs.len()],
            output_notes: outputs,
            parties: parties(),
            k_public: 0,
        });
        TestResult::from_bool(matches!(result, Err(RequestError::Unbalanced { .. })))
    }
}
