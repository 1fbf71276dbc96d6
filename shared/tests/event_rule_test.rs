use anyhow::Result;
use std::cell::Cell;
use tracectl_shared::bytecode::{Bytecode, BytecodeCompiler, CompileError, Credentials};
use tracectl_shared::error::{FilterError, PayloadError, RuleError};
use tracectl_shared::event_rule::{
    EventRule, EventRuleKind, KernelFunctionRule, KernelProbeRule, SyscallRule, TracepointRule,
    UserspaceProbeRule,
};
use tracectl_shared::log_level_rule::LogLevelRule;
use tracectl_shared::protocol::{Payload, PayloadView};
use tracectl_shared::types::domain::DomainType;
use tracectl_shared::types::location::{
    KernelProbeLocation, UserspaceProbeLocation, UserspaceProbeLookup,
};
use tracectl_shared::types::loglevel::loglevel_from_name;

const PATTERN: &str = "my_event_*";
const FILTER: &str = "msg_id == 23 && size >= 2048";
const EXCLUSIONS: [&str; 3] = ["my_event_test1", "my_event_test2", "my_event_test3"];

struct CountingCompiler {
    calls: Cell<usize>,
}

impl BytecodeCompiler for CountingCompiler {
    fn compile(&self, filter: &str, _creds: &Credentials) -> Result<Bytecode, CompileError> {
        self.calls.set(self.calls.get() + 1);
        Ok(Bytecode::new(filter.bytes().rev().collect()))
    }
}

struct RejectingCompiler;

impl BytecodeCompiler for RejectingCompiler {
    fn compile(&self, filter: &str, _creds: &Credentials) -> Result<Bytecode, CompileError> {
        Err(CompileError::Rejected(format!("syntax error in '{}'", filter)))
    }
}

fn encode(rule: &EventRule) -> Result<Payload> {
    let mut payload = Payload::new();
    rule.serialize(&mut payload)?;
    Ok(payload)
}

fn assert_round_trip(rule: &EventRule) -> Result<()> {
    let payload = encode(rule)?;
    let (decoded, consumed) = EventRule::create_from_payload(payload.view())?;
    assert_eq!(consumed, payload.len());
    assert_eq!(&decoded, rule);
    assert_eq!(decoded.hash(), rule.hash());
    Ok(())
}

/// Full tracepoint rule for `domain`, with whatever the domain supports.
fn full_tracepoint(domain: DomainType) -> Result<TracepointRule> {
    let mut rule = TracepointRule::new(domain);
    rule.set_pattern(PATTERN)?;
    rule.set_filter(FILTER)?;

    let info = loglevel_from_name(domain, "INFO");
    match info {
        Some(level) => rule.set_log_level_rule(&LogLevelRule::Exactly(level))?,
        None => assert_eq!(
            rule.set_log_level_rule(&LogLevelRule::Exactly(0)),
            Err(RuleError::Unsupported)
        ),
    }

    for exclusion in EXCLUSIONS {
        match rule.add_exclusion(exclusion) {
            Ok(()) => assert_eq!(domain, DomainType::Ust),
            Err(err) => {
                assert_eq!(err, RuleError::Unsupported);
                assert_ne!(domain, DomainType::Ust);
            }
        }
    }
    Ok(rule)
}

#[test]
fn test_tracepoint_round_trip_per_domain() -> Result<()> {
    for domain in DomainType::ALL {
        let rule = full_tracepoint(domain)?;
        assert_eq!(rule.pattern(), PATTERN);
        assert_eq!(rule.filter_expression(), Some(FILTER));
        let expected_exclusions = if domain == DomainType::Ust { 3 } else { 0 };
        assert_eq!(rule.exclusions_count(), expected_exclusions);

        let rule = EventRule::from(rule);
        assert_eq!(rule.kind(), EventRuleKind::Tracepoint);
        assert_eq!(rule.domain_type(), domain);
        assert_eq!(rule.targets_agent_domain(), domain.is_agent());
        assert_round_trip(&rule)?;
    }
    Ok(())
}

#[test]
fn test_syscall_round_trip() -> Result<()> {
    let mut rule = SyscallRule::new();
    rule.set_pattern(PATTERN)?;
    rule.set_filter(FILTER)?;
    let rule = EventRule::from(rule);
    assert_eq!(rule.domain_type(), DomainType::Kernel);
    assert_round_trip(&rule)
}

#[test]
fn test_probe_round_trips() -> Result<()> {
    for location in [
        KernelProbeLocation::address(50),
        KernelProbeLocation::symbol("schedule", 50)?,
    ] {
        let mut rule = KernelProbeRule::new(location);
        rule.set_event_name("my_probe")?;
        assert_round_trip(&rule.into())?;
    }

    let location = UserspaceProbeLocation::function(
        "/proc/self/exe",
        "process_request",
        UserspaceProbeLookup::FunctionElf,
    )?;
    let mut rule = UserspaceProbeRule::new(location);
    rule.set_event_name("my_uprobe")?;
    assert_round_trip(&rule.into())
}

#[test]
fn test_kernel_function_is_not_decodable() -> Result<()> {
    let mut rule = KernelFunctionRule::new(KernelProbeLocation::symbol("do_sys_open", 0)?);
    rule.set_event_name("open")?;
    let payload = encode(&rule.into())?;
    assert_eq!(
        EventRule::create_from_payload(payload.view()).unwrap_err(),
        PayloadError::UnknownRuleKind(3)
    );
    Ok(())
}

#[test]
fn test_unknown_kind_rejected() {
    let data = [42u8, 0, 0, 0];
    assert_eq!(
        EventRule::create_from_payload(PayloadView::new(&data)).unwrap_err(),
        PayloadError::UnknownRuleKind(42)
    );
}

#[test]
fn test_decoded_rule_must_validate() -> Result<()> {
    let unnamed = EventRule::from(KernelProbeRule::new(KernelProbeLocation::address(50)));
    assert!(!unnamed.validate());
    let payload = encode(&unnamed)?;
    assert_eq!(
        EventRule::create_from_payload(payload.view()).unwrap_err(),
        PayloadError::InvalidRule
    );
    Ok(())
}

#[test]
fn test_truncation_at_every_offset() -> Result<()> {
    let mut rules = vec![EventRule::from(full_tracepoint(DomainType::Ust)?)];
    rules.push(full_tracepoint(DomainType::Python)?.into());
    let mut syscall = SyscallRule::new();
    syscall.set_pattern(PATTERN)?;
    syscall.set_filter(FILTER)?;
    rules.push(syscall.into());

    for location in [
        KernelProbeLocation::address(50),
        KernelProbeLocation::symbol("schedule", 50)?,
    ] {
        let mut probe = KernelProbeRule::new(location);
        probe.set_event_name("my_probe")?;
        rules.push(probe.into());
    }

    for location in [
        UserspaceProbeLocation::function(
            "/proc/self/exe",
            "process_request",
            UserspaceProbeLookup::FunctionElf,
        )?,
        UserspaceProbeLocation::tracepoint("/usr/bin/app", "provider", "probe")?,
    ] {
        let mut uprobe = UserspaceProbeRule::new(location);
        uprobe.set_event_name("my_uprobe")?;
        rules.push(uprobe.into());
    }

    for rule in &rules {
        let payload = encode(rule)?;
        let bytes = payload.as_bytes();
        for len in 0..bytes.len() {
            let result = EventRule::create_from_payload(PayloadView::new(&bytes[..len]));
            assert!(result.is_err(), "{} bytes of {} decoded", len, bytes.len());
        }
    }
    Ok(())
}

#[test]
fn test_trailing_bytes_are_not_consumed() -> Result<()> {
    let rule = EventRule::from(full_tracepoint(DomainType::Jul)?);
    let mut payload = encode(&rule)?;
    let expected = payload.len();
    payload.append_u32(0xdead_beef);

    let (decoded, consumed) = EventRule::create_from_payload(payload.view())?;
    assert_eq!(decoded, rule);
    assert_eq!(consumed, expected);
    Ok(())
}

#[test]
fn test_equality_across_kinds() -> Result<()> {
    let mut tracepoint = TracepointRule::new(DomainType::Kernel);
    tracepoint.set_pattern("openat")?;
    let mut syscall = SyscallRule::new();
    syscall.set_pattern("openat")?;

    let tracepoint = EventRule::from(tracepoint);
    let syscall = EventRule::from(syscall);
    assert_ne!(tracepoint, syscall);
    assert_eq!(tracepoint, tracepoint);
    assert!(tracepoint.as_syscall().is_none());
    assert!(syscall.as_syscall().is_some());
    Ok(())
}

#[test]
fn test_exclusion_order_changes_equality_not_hash() -> Result<()> {
    let mut forward = TracepointRule::new(DomainType::Ust);
    let mut backward = TracepointRule::new(DomainType::Ust);
    for exclusion in EXCLUSIONS {
        forward.add_exclusion(exclusion)?;
    }
    for exclusion in EXCLUSIONS.iter().rev() {
        backward.add_exclusion(exclusion)?;
    }

    let (forward, backward) = (EventRule::from(forward), EventRule::from(backward));
    assert_ne!(forward, backward);
    assert_eq!(forward.hash(), backward.hash());
    Ok(())
}

#[test]
fn test_filter_bytecode_per_domain() -> Result<()> {
    let creds = Credentials::new(1000, 1000);
    for domain in DomainType::ALL {
        let compiler = CountingCompiler {
            calls: Cell::new(0),
        };
        let mut rule = EventRule::from(full_tracepoint(domain)?);
        rule.generate_filter_bytecode(&creds, &compiler)?;
        assert_eq!(compiler.calls.get(), 1);

        let expected = if domain.is_agent() {
            rule.as_tracepoint()
                .and_then(TracepointRule::generate_agent_filter)
        } else {
            Some(FILTER.to_string())
        };
        assert_eq!(rule.filter(), expected.as_deref());

        let bytecode = rule.filter_bytecode().map(|b| b.as_bytes().to_vec());
        let reversed = expected.map(|f| f.bytes().rev().collect::<Vec<_>>());
        assert_eq!(bytecode, reversed);
    }
    Ok(())
}

#[test]
fn test_agent_filter_with_match_all_and_level() -> Result<()> {
    let mut rule = TracepointRule::new(DomainType::Jul);
    rule.set_log_level_rule(&LogLevelRule::AtLeastAsSevereAs(800))?;
    let mut rule = EventRule::from(rule);

    let compiler = CountingCompiler {
        calls: Cell::new(0),
    };
    rule.generate_filter_bytecode(&Credentials::new(0, 0), &compiler)?;
    assert_eq!(rule.filter(), Some("int_loglevel >= 800"));
    Ok(())
}

#[test]
fn test_compile_failure_is_reported() -> Result<()> {
    let mut rule = TracepointRule::new(DomainType::Ust);
    rule.set_filter("bad ==")?;
    let mut rule = EventRule::from(rule);

    let err = rule
        .generate_filter_bytecode(&Credentials::new(1000, 1000), &RejectingCompiler)
        .unwrap_err();
    assert!(matches!(err, FilterError::Compile(CompileError::Rejected(_))));
    assert!(rule.filter_bytecode().is_none());
    Ok(())
}

#[test]
fn test_probes_have_no_filter() -> Result<()> {
    let mut rule = KernelProbeRule::new(KernelProbeLocation::address(50));
    rule.set_event_name("my_probe")?;
    let mut rule = EventRule::from(rule);
    rule.generate_filter_bytecode(&Credentials::new(0, 0), &RejectingCompiler)?;
    assert!(rule.filter().is_none());
    assert!(rule.generate_exclusions()?.is_none());
    Ok(())
}

#[test]
fn test_generated_artifacts() -> Result<()> {
    let rule = EventRule::from(full_tracepoint(DomainType::Ust)?);
    let exclusions = rule.generate_exclusions()?.expect("UST rule has exclusions");
    assert_eq!(exclusions.names().collect::<Vec<_>>(), EXCLUSIONS);

    let event = rule.generate_lttng_event()?;
    assert_eq!(event.name(), PATTERN);
    Ok(())
}

#[test]
fn test_json_view() -> Result<()> {
    let rule = EventRule::from(full_tracepoint(DomainType::Python)?);
    let json = serde_json::to_value(&rule)?;
    assert_eq!(json["type"], "tracepoint");
    assert_eq!(json["domain"], "python");
    assert_eq!(json["pattern"], PATTERN);
    assert_eq!(json["log_level_rule"]["type"], "exactly");
    assert_eq!(json["log_level_rule"]["level"], 20);
    assert!(json.get("internal_filter").is_none());
    Ok(())
}
