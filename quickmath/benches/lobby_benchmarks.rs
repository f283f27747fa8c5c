use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use quickmath::lobby::{Lobby, LobbyConfig};
use std::{
    hint::black_box,
    time::{Duration, Instant},
};

/// Helper to create a lobby with N players and a running round
fn setup_playing_lobby(n_players: usize) -> Lobby {
    let config = LobbyConfig {
        answer_debounce_ms: 0,
        ..Default::default()
    };
    let mut lobby = Lobby::new("BENCH1", &config);

    for i in 0..n_players {
        lobby.join(format!("player{i}"), format!("Player {i}"));
    }
    for i in 0..n_players {
        lobby.set_ready(&format!("player{i}"), 0);
    }

    lobby
}

/// Benchmark the quorum check as the roster grows
fn bench_ready_quorum(c: &mut Criterion) {
    let mut group = c.benchmark_group("ready_quorum");

    for n_players in [2, 8, 32] {
        group.bench_with_input(
            BenchmarkId::from_parameter(n_players),
            &n_players,
            |b, &n| {
                b.iter(|| {
                    let mut lobby = Lobby::new("BENCH2", &LobbyConfig::default());
                    for i in 0..n {
                        lobby.join(format!("player{i}"), "x".to_string());
                    }
                    for i in 0..n {
                        black_box(lobby.set_ready(&format!("player{i}"), 0));
                    }
                });
            },
        );
    }

    group.finish();
}

/// Benchmark answer submission on a running round
fn bench_submit_answer(c: &mut Criterion) {
    let mut lobby = setup_playing_lobby(8);
    let mut now = Instant::now();

    c.bench_function("submit_answer", |b| {
        b.iter(|| {
            now += Duration::from_millis(1);
            black_box(lobby.submit_answer("player3", true, now));
        });
    });
}

/// Benchmark snapshot creation (done once per broadcast)
fn bench_snapshot(c: &mut Criterion) {
    let mut group = c.benchmark_group("snapshot");

    for n_players in [2, 8, 32] {
        let lobby = setup_playing_lobby(n_players);
        group.bench_with_input(
            BenchmarkId::from_parameter(n_players),
            &lobby,
            |b, lobby| {
                b.iter(|| black_box(lobby.snapshot()));
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_ready_quorum, bench_submit_answer, bench_snapshot);
criterion_main!(benches);
