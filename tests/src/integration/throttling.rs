//! # Slash Throttling
//!
//! Consumer-reported jailings are rate limited by the provider's slash meter
//! and drained round-robin across consumers.

#[cfg(test)]
mod tests {
    use crate::harness::{validator, Network};
    use ccv_consumer::ConsumerEffect;
    use ccv_types::{ChainId, ConsAddress, ProviderParams};
    use std::collections::BTreeMap;
    use std::time::Duration;

    fn throttled_params() -> ProviderParams {
        ProviderParams {
            slash_meter_replenish_fraction: "0.10".parse().unwrap(),
            slash_meter_replenish_period: Duration::from_secs(20),
            ..ProviderParams::for_testing()
        }
    }

    fn assert_queues_consistent(net: &Network) {
        let per_consumer: usize = net
            .consumers
            .keys()
            .map(|chain_id| net.provider.service.consumer_queue_size(chain_id))
            .sum();
        assert_eq!(net.provider.service.global_queue_size(), per_consumer);
    }

    #[test]
    fn test_throttled_carol_waits_for_replenishment() {
        let mut net = Network::new(
            &[("alice", 511), ("bob", 500), ("carol", 500)],
            throttled_params(),
        );
        let consu = net.add_consumer("consu");
        assert_eq!(net.provider.service.slash_meter(), 152);
        net.step(1);

        net.consumer(&consu)
            .report_downtime(&validator("bob"))
            .unwrap();
        net.step(1);
        net.step(1);
        assert_eq!(net.provider_power("bob"), 0);
        assert_eq!(net.consumer_power(&consu, "bob"), 0);
        assert_eq!(net.provider.service.slash_meter(), -348);

        net.consumer(&consu)
            .report_downtime(&validator("carol"))
            .unwrap();
        net.step(1);
        net.step(1);
        assert_eq!(net.provider.service.global_queue_size(), 1);
        assert_eq!(net.provider.service.consumer_queue_size(&consu), 1);
        assert_eq!(net.provider_power("carol"), 500);

        // t = 20, 40, 60: three replenishments of 102 leave the meter at -42.
        net.step(15);
        net.step(20);
        net.step(20);
        assert_eq!(net.now().as_secs(), 60);
        assert_eq!(net.provider.service.slash_meter(), -42);
        assert_eq!(net.provider_power("carol"), 500);
        assert_eq!(net.consumer_power(&consu, "carol"), 500);
        assert_queues_consistent(&net);

        net.step(20);
        assert_eq!(net.provider.service.global_queue_size(), 0);
        assert_eq!(net.provider_power("carol"), 0);
        assert_eq!(net.consumer_power(&consu, "carol"), 0);
        assert_eq!(net.jailings(), vec![validator("bob"), validator("carol")]);
        assert!(net
            .consumer_effects(&consu)
            .contains(&ConsumerEffect::SlashAcknowledged {
                address: validator("carol"),
                jailed: true
            }));
    }

    #[test]
    fn test_round_robin_across_three_consumers() {
        let names: Vec<String> = (0..10).map(|i| format!("val-{i}")).collect();
        let validators: Vec<(&str, i64)> = names.iter().map(|n| (n.as_str(), 100)).collect();
        let mut net = Network::new(&validators, throttled_params());
        let a = net.add_consumer("cons-a");
        let b = net.add_consumer("cons-b");
        let c = net.add_consumer("cons-c");
        net.step(1);

        let reports: [(&ChainId, &[usize]); 3] = [(&a, &[0, 1, 2]), (&b, &[3, 4, 5]), (&c, &[6])];
        let mut reporter: BTreeMap<ConsAddress, ChainId> = BTreeMap::new();
        for (chain_id, indices) in reports {
            for i in indices {
                let address = validator(&names[*i]);
                net.consumer(chain_id).report_downtime(&address).unwrap();
                reporter.insert(address, chain_id.clone());
            }
        }
        net.step(1);
        net.step(1);
        assert_queues_consistent(&net);

        for _ in 0..20 {
            if net.provider.service.global_queue_size() == 0 {
                break;
            }
            net.step(20);
            assert_queues_consistent(&net);
        }
        assert_eq!(net.provider.service.global_queue_size(), 0);

        let order: Vec<ChainId> = net
            .jailings()
            .iter()
            .map(|address| reporter[address].clone())
            .collect();
        assert_eq!(
            order,
            vec![a.clone(), b.clone(), c, a.clone(), b.clone(), a, b]
        );
    }

    #[test]
    fn test_full_fraction_never_throttles() {
        let mut net = Network::new(
            &[("alice", 509), ("bob", 500), ("carol", 501), ("dave", 490)],
            ProviderParams::for_testing(),
        );
        let consu = net.add_consumer("consu");
        net.step(1);
        for name in ["bob", "carol", "dave"] {
            net.consumer(&consu)
                .report_downtime(&validator(name))
                .unwrap();
        }
        net.step(1);
        net.step(1);

        assert_eq!(net.jailings().len(), 3);
        assert_eq!(net.provider.service.global_queue_size(), 0);
        assert_eq!(net.provider.service.slash_meter(), 509);
        for name in ["bob", "carol", "dave"] {
            assert_eq!(net.consumer_power(&consu, name), 0);
        }
    }
}
