//! # Randomized Interleavings
//!
//! Random downtime reports from three consumers, with a seeded RNG choosing
//! which chains produce a block at each tick. After every tick:
//!
//! - P1: the slash meter never exceeds its allowance
//! - P2: the global queue is exactly the union of the per-consumer queues
//! - P3: a soft-opted-out validator is never jailed
//! - P4: no validator is jailed twice
//!
//! P5 replays the same inputs and expects the same jailing order.

#[cfg(test)]
mod tests {
    use crate::harness::{validator, Network};
    use ccv_types::{ChainId, Dec, ProviderParams};
    use proptest::prelude::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use std::collections::BTreeSet;
    use std::time::Duration;

    const PROPTEST_CASES: u32 = 32;

    /// Index 0 stays under 5% of total power even with every reportable
    /// validator jailed; `anchor` is never reported.
    const VALIDATORS: [(&str, i64); 6] = [
        ("tiny", 10),
        ("val-1", 1000),
        ("val-2", 1000),
        ("val-3", 1000),
        ("val-4", 1000),
        ("anchor", 1000),
    ];
    const REPORTABLE: usize = 5;
    const CONSUMERS: [&str; 3] = ["cons-a", "cons-b", "cons-c"];

    #[derive(Debug, Clone)]
    struct Tick {
        consumer: usize,
        validator: usize,
        secs: u64,
    }

    fn tick_strategy() -> impl Strategy<Value = Tick> {
        (0..CONSUMERS.len(), 0..REPORTABLE, 1u64..30).prop_map(|(consumer, validator, secs)| Tick {
            consumer,
            validator,
            secs,
        })
    }

    fn build() -> (Network, Vec<ChainId>) {
        let params = ProviderParams {
            slash_meter_replenish_fraction: "0.10".parse().unwrap(),
            slash_meter_replenish_period: Duration::from_secs(20),
            ..ProviderParams::for_testing()
        };
        let mut net = Network::new(&VALIDATORS, params);
        // Consumers report everyone; the provider has to enforce opt-out.
        net.consumer_params.soft_opt_out_threshold = Dec::ZERO;
        let chains = CONSUMERS.iter().map(|name| net.add_consumer(name)).collect();
        net.step(1);
        (net, chains)
    }

    fn check_invariants(net: &Network, chains: &[ChainId]) -> Result<(), TestCaseError> {
        let service = &net.provider.service;
        prop_assert!(
            service.slash_meter() <= service.slash_meter_allowance(),
            "meter {} above allowance {}",
            service.slash_meter(),
            service.slash_meter_allowance()
        );

        let per_consumer: usize = chains.iter().map(|c| service.consumer_queue_size(c)).sum();
        prop_assert_eq!(service.global_queue_size(), per_consumer);

        let jailed = net.jailings();
        prop_assert!(!jailed.contains(&validator("tiny")));
        prop_assert_eq!(net.provider_power("tiny"), 10);
        let unique: BTreeSet<_> = jailed.iter().collect();
        prop_assert_eq!(unique.len(), jailed.len());
        Ok(())
    }

    fn run(seed: u64, ticks: &[Tick]) -> Result<Vec<ccv_types::ConsAddress>, TestCaseError> {
        let (mut net, chains) = build();
        let mut rng = StdRng::seed_from_u64(seed);

        for tick in ticks {
            let chain_id = &chains[tick.consumer];
            // Unknown-validator errors are expected once a report's target is jailed.
            let _ = net
                .consumer(chain_id)
                .report_downtime(&validator(VALIDATORS[tick.validator].0));

            net.advance(tick.secs);
            if rng.gen_bool(0.8) {
                net.provider_block();
            }
            for chain_id in &chains {
                if rng.gen_bool(0.7) {
                    net.consumer_block(chain_id);
                }
            }
            check_invariants(&net, &chains)?;
        }
        Ok(net.jailings())
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(PROPTEST_CASES))]

        #[test]
        fn prop_throttle_invariants_hold(
            seed in any::<u64>(),
            ticks in prop::collection::vec(tick_strategy(), 1..40),
        ) {
            run(seed, &ticks)?;
        }

        #[test]
        fn prop_same_inputs_same_jailings(
            seed in any::<u64>(),
            ticks in prop::collection::vec(tick_strategy(), 1..20),
        ) {
            let first = run(seed, &ticks)?;
            let second = run(seed, &ticks)?;
            prop_assert_eq!(first, second);
        }
    }
}
