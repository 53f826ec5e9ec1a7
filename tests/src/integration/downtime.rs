//! # Downtime Scenarios
//!
//! | Scenario | Setup | Expectation |
//! |----------|-------|-------------|
//! | bob | consumer reports downtime | jailed on provider, then consumer; no burn |
//! | carol | provider's own downtime detection | jailed and slashed 1%, back at 495 after unjail |
//! | alice | 60 of 1510 power | soft opted out, untouched on both chains |

#[cfg(test)]
mod tests {
    use crate::harness::{validator, Network};
    use ccv_consumer::{ConsumerEffect, DowntimeSkip};
    use ccv_provider::{SkipReason, SlashOutcome, StakingError, ProviderError};
    use ccv_types::{Dec, ProviderParams};

    fn standard() -> Network {
        Network::new(
            &[("alice", 509), ("bob", 500), ("carol", 501)],
            ProviderParams::for_testing(),
        )
    }

    #[test]
    fn test_bob_consumer_downtime_jails_without_slashing() {
        let mut net = standard();
        let consu = net.add_consumer("consu");
        net.step(1);

        net.consumer(&consu)
            .report_downtime(&validator("bob"))
            .unwrap();
        net.step(1);
        assert!(net.consumer(&consu).is_downtime_outstanding(&validator("bob")));

        // Provider applies the jailing; the consumer has not seen the VSC yet.
        net.advance(1);
        net.provider_block();
        assert_eq!(net.provider_power("bob"), 0);
        assert_eq!(net.consumer_power(&consu, "bob"), 500);

        net.consumer_blocks();
        assert_eq!(net.consumer_power(&consu, "bob"), 0);
        assert!(!net.consumer(&consu).is_downtime_outstanding(&validator("bob")));
        assert!(net
            .consumer_effects(&consu)
            .contains(&ConsumerEffect::SlashAcknowledged {
                address: validator("bob"),
                jailed: true
            }));

        // Jail period is 60s from the jailing block.
        assert!(matches!(
            net.provider.service.unjail(&validator("bob")),
            Err(ProviderError::Staking(StakingError::StillJailed { .. }))
        ));
        net.step(60);
        net.provider.service.unjail(&validator("bob")).unwrap();
        net.step(1);

        assert_eq!(net.provider_power("bob"), 500);
        assert_eq!(net.consumer_power(&consu, "bob"), 500);
        assert_eq!(net.tokens("bob"), 500_000_000);
        assert_eq!(net.jailings(), vec![validator("bob")]);
    }

    #[test]
    fn test_carol_provider_downtime_is_slashed() {
        let mut net = standard();
        let consu = net.add_consumer("consu");
        net.step(1);

        let execution = net
            .provider
            .service
            .handle_local_downtime(&validator("carol"))
            .unwrap();
        assert_eq!(execution.outcome, SlashOutcome::Jailed { power: 501 });
        net.step(1);
        assert_eq!(net.provider_power("carol"), 0);
        assert_eq!(net.consumer_power(&consu, "carol"), 0);

        net.step(60);
        net.provider.service.unjail(&validator("carol")).unwrap();
        net.step(1);
        assert_eq!(net.provider_power("carol"), 495);
        assert_eq!(net.consumer_power(&consu, "carol"), 495);
    }

    #[test]
    fn test_alice_soft_opt_out_on_both_chains() {
        let mut net = Network::new(
            &[("alice", 60), ("bob", 500), ("carol", 950)],
            ProviderParams::for_testing(),
        );
        let consu = net.add_consumer("consu");
        net.step(1);

        assert_eq!(
            net.consumer(&consu)
                .report_downtime(&validator("alice"))
                .unwrap(),
            ConsumerEffect::DowntimeSkipped {
                address: validator("alice"),
                reason: DowntimeSkip::SoftOptOut
            }
        );
        let execution = net
            .provider
            .service
            .handle_local_downtime(&validator("alice"))
            .unwrap();
        assert_eq!(execution.outcome, SlashOutcome::Skipped(SkipReason::SoftOptOut));

        for _ in 0..3 {
            net.step(5);
        }
        assert_eq!(net.provider_power("alice"), 60);
        assert_eq!(net.consumer_power(&consu, "alice"), 60);
        assert_eq!(net.tokens("alice"), 60_000_000);
        assert!(net.jailings().is_empty());
    }

    #[test]
    fn test_provider_enforces_opt_out_for_eager_consumer() {
        let mut net = Network::new(
            &[("alice", 60), ("bob", 500), ("carol", 950)],
            ProviderParams::for_testing(),
        );
        // This consumer reports everyone.
        net.consumer_params.soft_opt_out_threshold = Dec::ZERO;
        let consu = net.add_consumer("consu");
        net.step(1);

        net.consumer(&consu)
            .report_downtime(&validator("alice"))
            .unwrap();
        for _ in 0..3 {
            net.step(1);
        }

        assert_eq!(net.provider_power("alice"), 60);
        assert_eq!(net.consumer_power(&consu, "alice"), 60);
        assert!(net
            .consumer_effects(&consu)
            .contains(&ConsumerEffect::SlashAcknowledged {
                address: validator("alice"),
                jailed: false
            }));
        assert!(!net.consumer(&consu).is_downtime_outstanding(&validator("alice")));
        assert_eq!(
            net.provider.service.slash_meter(),
            net.provider.service.slash_meter_allowance()
        );
    }
}
