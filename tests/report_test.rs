#[cfg(test)]
mod tests {
    use std::time::Duration;

    use linktest::session::{compute_latency_stats, SessionResult};
    use linktest::{
        Config, ConnId, Connection, ExitCode, LinkError, PeeringReport, Report, Role,
        SessionParams, SessionReport,
    };

    fn approx(actual: f64, expected: f64) -> bool {
        (actual - expected).abs() < 1e-6
    }

    #[test]
    fn latency_stats_empty_is_none() {
        assert!(compute_latency_stats(&[]).is_none());
    }

    #[test]
    fn latency_stats_identical_samples() {
        // Every percentile of n identical values is that value.
        for n in 1..=5 {
            let samples = vec![Duration::from_millis(7); n];
            let stats = compute_latency_stats(&samples).unwrap();
            assert_eq!(n, stats.count);
            assert!(approx(stats.min_ms, 7.0));
            assert!(approx(stats.max_ms, 7.0));
            assert!(approx(stats.avg_ms, 7.0));
            assert!(approx(stats.p50_ms, 7.0));
            assert!(approx(stats.p95_ms, 7.0));
            assert!(approx(stats.p99_ms, 7.0));
        }
    }

    #[test]
    fn latency_stats_percentiles_nearest_rank() {
        // 1..=100 ms, deliberately unsorted on input.
        let samples: Vec<Duration> = (1..=100u64).rev().map(Duration::from_millis).collect();
        let stats = compute_latency_stats(&samples).unwrap();

        assert_eq!(100, stats.count);
        assert!(approx(stats.min_ms, 1.0));
        assert!(approx(stats.max_ms, 100.0));
        assert!(approx(stats.avg_ms, 50.5));
        // index = floor(p/100 * 99)
        assert!(approx(stats.p50_ms, 50.0));
        assert!(approx(stats.p95_ms, 95.0));
        assert!(approx(stats.p99_ms, 99.0));
    }

    #[test]
    fn crc_pass_rate() {
        let clean = SessionResult {
            received: 100,
            crc_ok: 100,
            ..Default::default()
        };
        assert!(approx(clean.crc_pass_rate(), 100.0));

        let partial = SessionResult {
            received: 100,
            crc_ok: 95,
            crc_errors: 5,
            ..Default::default()
        };
        assert!(approx(partial.crc_pass_rate(), 95.0));

        let nothing = SessionResult::default();
        assert!(approx(nothing.crc_pass_rate(), 0.0));
    }

    #[test]
    fn throughput_derivation() {
        let result = SessionResult {
            bytes_sent: 1000,
            bytes_received: 1000,
            elapsed: Duration::from_secs(1),
            ..Default::default()
        };
        // 2000 bytes/s * 10 wire bits per byte (8N1)
        assert!(approx(result.throughput_baud(10), 20000.0));
        // 2000 bytes/s * 8 / 1000
        assert!(approx(result.throughput_kbps(), 16.0));
    }

    #[test]
    fn throughput_zero_duration_is_zero() {
        let result = SessionResult {
            bytes_sent: 1000,
            ..Default::default()
        };
        assert!(approx(result.throughput_baud(10), 0.0));
        assert!(approx(result.throughput_kbps(), 0.0));
    }

    #[test]
    fn session_report_success_requires_clean_crc() {
        let clean = SessionReport::new(SessionResult {
            success: true,
            received: 100,
            crc_ok: 100,
            ..Default::default()
        });
        assert!(clean.success());

        let impure = SessionReport::new(SessionResult {
            success: true,
            received: 100,
            crc_ok: 95,
            crc_errors: 5,
            ..Default::default()
        });
        assert!(!impure.success());

        let failed = SessionReport::new(SessionResult {
            success: false,
            error: Some(LinkError::SessionTimeout(3)),
            ..Default::default()
        });
        assert!(!failed.success());
    }

    #[test]
    fn peering_report_success_tracks_connection() {
        let conn = Connection {
            connection_id: ConnId([1, 2, 3, 4]),
            role: Role::Server,
            session_params: SessionParams { msg_count: 10 },
        };
        assert!(PeeringReport::connected(&conn).success());
        assert!(PeeringReport::connected_with_params(&conn).success());

        let config = Config::default();
        let failed = PeeringReport::failed(LinkError::PeeringTimeout(config.handshake_timeout));
        assert!(!failed.success());
    }

    #[test]
    fn exit_code_values() {
        assert_eq!(0, ExitCode::Success.code());
        assert_eq!(1, ExitCode::PeeringFailed.code());
        assert_eq!(2, ExitCode::NoData.code());
        assert_eq!(3, ExitCode::CrcErrors.code());
    }
}
