// packages/engine/tests/session_integration.rs
//! End-to-end resolution through the public API, the way the preload
//! boundary drives it: raw libc structures in, raw structures out.

use sockmap_engine::mapping::{parse_inet, parse_unix, resolve_port};
use sockmap_engine::{
    EnvSource, MappingSource, Session, SocketAddress, SocketOp, StaticSource, SUN_PATH_CAPACITY,
};
use std::net::Ipv4Addr;

fn static_session(unix: &str, inet: &str) -> Session<StaticSource> {
    Session::new(StaticSource::new().with_unix(unix).with_inet(inet))
}

#[test]
fn test_rewrite_raw_sockaddr_un() {
    let mut session = static_session("/run/postgresql:/tmp/pg/.s.PGSQL.5432", "");

    let mut raw = SocketAddress::unix("/run/postgresql/.s.PGSQL.5432")
        .to_sockaddr_un()
        .unwrap();
    let incoming = SocketAddress::from_sockaddr_un(&raw);

    let rewritten = session
        .resolve_bind_or_connect(SocketOp::Connect, &incoming)
        .unwrap()
        .expect("path should be mapped");
    rewritten.write_sockaddr_un(&mut raw);

    assert_eq!(
        SocketAddress::from_sockaddr_un(&raw),
        SocketAddress::unix("/tmp/pg/.s.PGSQL.5432")
    );
}

#[test]
fn test_rewrite_raw_sockaddr_in() {
    let mut session = static_session("", "6379:16379");

    let mut raw = SocketAddress::inet(Ipv4Addr::LOCALHOST, 6379)
        .to_sockaddr_in()
        .unwrap();
    let incoming = SocketAddress::from_sockaddr_in(&raw);

    let rewritten = session
        .resolve_bind_or_connect(SocketOp::Bind, &incoming)
        .unwrap()
        .expect("port should be mapped");
    rewritten.write_sockaddr_in(&mut raw);

    assert_eq!(u16::from_be(raw.sin_port), 16379);
    assert_eq!(raw.sin_addr.s_addr, u32::from(Ipv4Addr::LOCALHOST).to_be());
}

#[test]
fn test_truncated_target_stays_terminated() {
    let target = format!("/tmp/{}", "deep/".repeat(40));
    let mut session = static_session(&format!("/run/a.sock:{}", target), "");

    let rewritten = session
        .resolve(&SocketAddress::unix("/run/a.sock"))
        .unwrap()
        .unwrap();
    let raw = rewritten.to_sockaddr_un().unwrap();

    assert_eq!(raw.sun_path[SUN_PATH_CAPACITY - 1], 0);
    match rewritten {
        SocketAddress::Unix(path) => {
            assert!(path.len() <= SUN_PATH_CAPACITY - 1);
            assert!(target.as_bytes().starts_with(path.as_bytes()));
        }
        other => panic!("unexpected family: {:?}", other),
    }
}

#[test]
fn test_unlink_then_bind_lifecycle() {
    let mut session = static_session("/var/run/app.sock:/tmp/app.sock", "");

    let unlinked = session.resolve_unlink("/var/run/app.sock").unwrap();
    let bound = session
        .resolve_bind_or_connect(SocketOp::Bind, &SocketAddress::unix("/var/run/app.sock"))
        .unwrap();

    assert_eq!(unlinked.as_deref(), Some("/tmp/app.sock"));
    assert_eq!(bound, Some(SocketAddress::unix("/tmp/app.sock")));
}

#[test]
fn test_empty_inet_configuration_is_identity() {
    for raw in ["", " ", ",,"] {
        let table = parse_inet(raw);
        for port in [0u16, 22, 80, 8080, 65535] {
            assert_eq!(resolve_port(port, &table), port);
        }
    }

    let mut session = Session::new(StaticSource::new().with_unix("/a:/b"));
    let addr = SocketAddress::inet(Ipv4Addr::UNSPECIFIED, 8080);
    assert_eq!(session.resolve(&addr).unwrap(), None);
}

#[test]
fn test_sessions_do_not_share_tables() {
    let mut first = static_session("/a:/first", "");
    let mut second = static_session("/a:/second", "");

    let addr = SocketAddress::unix("/a");
    assert_eq!(first.resolve(&addr).unwrap(), Some(SocketAddress::unix("/first")));
    assert_eq!(second.resolve(&addr).unwrap(), Some(SocketAddress::unix("/second")));
}

#[test]
fn test_session_per_thread() {
    let handles: Vec<_> = (0..4u16)
        .map(|i| {
            std::thread::spawn(move || {
                let mut session = static_session("", &format!("80:{}", 8000 + i));
                session
                    .resolve(&SocketAddress::inet(Ipv4Addr::LOCALHOST, 80))
                    .unwrap()
            })
        })
        .collect();

    for (i, handle) in handles.into_iter().enumerate() {
        let resolved = handle.join().unwrap();
        assert_eq!(
            resolved,
            Some(SocketAddress::inet(Ipv4Addr::LOCALHOST, 8000 + i as u16))
        );
    }
}

#[test]
fn test_report_matches_parsed_tables() {
    let unix = "/a:/X\n/ab:/Y\n/c";
    let inet = "80:8080,443";
    let mut session = static_session(unix, inet);

    let report = session.report_mappings().unwrap();
    assert_eq!(report.unix, parse_unix(unix).entries());
    assert_eq!(report.inet, parse_inet(inet).entries());
}

#[test]
fn test_env_source_session() {
    let unix_var = "SOCKMAP_IT_UNIX_MAP";
    let inet_var = "SOCKMAP_IT_INET_MAP";
    std::env::set_var(unix_var, "/run/it.sock:/tmp/it.sock");
    std::env::set_var(inet_var, "5000:6000");

    let source = EnvSource::new(unix_var, inet_var);
    assert!(source.unix_map().is_some());

    let mut session = Session::new(source);
    session.init().unwrap();

    // Cached: later changes to the environment are not observed
    std::env::set_var(inet_var, "5000:7000");
    let resolved = session
        .resolve(&SocketAddress::inet(Ipv4Addr::LOCALHOST, 5000))
        .unwrap();
    assert_eq!(resolved, Some(SocketAddress::inet(Ipv4Addr::LOCALHOST, 6000)));

    std::env::remove_var(unix_var);
    std::env::remove_var(inet_var);
}

#[test]
fn test_missing_unix_mapping_from_env() {
    let mut session = Session::new(EnvSource::new(
        "SOCKMAP_IT_UNSET_UNIX_MAP",
        "SOCKMAP_IT_UNSET_INET_MAP",
    ));

    let err = session.resolve_unlink("/run/a.sock").unwrap_err();
    assert!(err.to_string().contains("SOCKMAP_IT_UNSET_UNIX_MAP"));
}
