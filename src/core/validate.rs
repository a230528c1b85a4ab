//! Structural validation of a declared stack.
//!
//! Never run implicitly: the descriptor accepts any values and passes them
//! through. Checks:
//! - References resolve to a construct of the expected kind
//! - Network has two public subnets and its subnets fit the block
//! - Internet-facing load balancers sit in public subnets only
//! - Health-check bounds and success-code syntax
//! - Capacity ordering
//! - Construct ids are alphanumeric
//!
//! A long auto-scaling grace period relative to the target-group failure
//! window is reported as a warning.

use super::cidr;
use super::types::*;
use regex::Regex;
use std::fmt;
use std::sync::LazyLock;

static CONSTRUCT_ID: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z][A-Za-z0-9]*$").unwrap_or_else(|e| unreachable!("{e}"))
});

static HTTP_CODE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d{3})(?:-(\d{3}))?$").unwrap_or_else(|e| unreachable!("{e}"))
});

/// Grace periods above this multiple of the failure window are flagged.
const GRACE_WARNING_FACTOR: u32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
}

/// One validation finding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub severity: Severity,
    pub message: String,
}

impl ValidationError {
    fn error(message: String) -> Self {
        Self {
            severity: Severity::Error,
            message,
        }
    }

    fn warning(message: String) -> Self {
        Self {
            severity: Severity::Warning,
            message,
        }
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.severity {
            Severity::Error => write!(f, "error: {}", self.message),
            Severity::Warning => write!(f, "warning: {}", self.message),
        }
    }
}

/// Validate a stack. Returns all findings (empty = valid).
pub fn validate_stack(stack: &Stack) -> Vec<ValidationError> {
    let mut findings = Vec::new();

    for (id, construct) in &stack.constructs {
        if !CONSTRUCT_ID.is_match(id) {
            findings.push(ValidationError::error(format!(
                "construct id '{}' must be alphanumeric and start with a letter",
                id
            )));
        }

        for (target, kind) in construct.references() {
            match stack.get(target) {
                None => findings.push(ValidationError::error(format!(
                    "{} '{}' references unknown {} '{}'",
                    construct.kind(),
                    id,
                    kind,
                    target
                ))),
                Some(c) if c.kind() != kind => findings.push(ValidationError::error(format!(
                    "{} '{}' references '{}' as a {}, but it is a {}",
                    construct.kind(),
                    id,
                    target,
                    kind,
                    c.kind()
                ))),
                Some(_) => {}
            }
        }

        match construct {
            Construct::Network(n) => check_network(id, n, &mut findings),
            Construct::LoadBalancer(lb) => {
                check_subnet_refs(stack, id, &lb.subnets, &mut findings);
                if lb.internet_facing {
                    check_public_placement(stack, id, &lb.subnets, &mut findings);
                }
            }
            Construct::TargetGroup(tg) => check_health_check(id, &tg.health_check, &mut findings),
            Construct::AutoScalingGroup(asg) => {
                check_subnet_refs(stack, id, &asg.subnets, &mut findings);
                check_capacity(id, &asg.capacity, &mut findings);
                check_grace_period(stack, id, asg, &mut findings);
            }
            _ => {}
        }
    }

    for (name, output) in &stack.outputs {
        let expected = match output.attribute {
            OutputAttribute::NetworkId => ConstructKind::Network,
            OutputAttribute::GroupName => ConstructKind::AutoScalingGroup,
            OutputAttribute::DnsName => ConstructKind::LoadBalancer,
        };
        if stack.get(&output.construct).map(Construct::kind) != Some(expected) {
            findings.push(ValidationError::error(format!(
                "output '{}' needs {} '{}'",
                name, expected, output.construct
            )));
        }
    }

    findings
}

/// True when no finding is an error.
pub fn is_valid(findings: &[ValidationError]) -> bool {
    !findings.iter().any(ValidationError::is_error)
}

fn check_network(id: &str, network: &Network, findings: &mut Vec<ValidationError>) {
    let public = network.public_subnets().len();
    if public < 2 {
        findings.push(ValidationError::error(format!(
            "network '{}' has {} public subnet(s), a load balancer needs at least 2",
            id, public
        )));
    }

    let block = match cidr::parse_block(&network.cidr) {
        Ok(b) => b,
        Err(e) => {
            findings.push(ValidationError::error(format!("network '{}': {}", id, e)));
            return;
        }
    };
    let masks: Vec<u8> = network.subnets.iter().map(|s| s.cidr_mask).collect();
    if let Err(e) = cidr::allocate(&block, &masks) {
        findings.push(ValidationError::error(format!("network '{}': {}", id, e)));
    }

    let mut seen = std::collections::HashSet::new();
    for s in &network.subnets {
        if !seen.insert(s.name.as_str()) {
            findings.push(ValidationError::error(format!(
                "network '{}' declares subnet '{}' twice",
                id, s.name
            )));
        }
    }
}

fn check_subnet_refs(
    stack: &Stack,
    id: &str,
    subnets: &[SubnetRef],
    findings: &mut Vec<ValidationError>,
) {
    if subnets.is_empty() {
        findings.push(ValidationError::error(format!("'{}' has no subnets", id)));
    }
    for s in subnets {
        if let Some(n) = stack.network(&s.network) {
            if n.subnet(&s.subnet).is_none() {
                findings.push(ValidationError::error(format!(
                    "'{}' references unknown subnet '{}' of network '{}'",
                    id, s.subnet, s.network
                )));
            }
        }
    }
}

fn check_public_placement(
    stack: &Stack,
    id: &str,
    subnets: &[SubnetRef],
    findings: &mut Vec<ValidationError>,
) {
    for s in subnets {
        let kind = stack
            .network(&s.network)
            .and_then(|n| n.subnet(&s.subnet))
            .map(|spec| spec.kind);
        if let Some(kind @ SubnetKind::PrivateIsolated) = kind {
            findings.push(ValidationError::error(format!(
                "internet-facing load balancer '{}' placed in {} subnet '{}'",
                id, kind, s.subnet
            )));
        }
    }
}

fn check_health_check(id: &str, hc: &HealthCheck, findings: &mut Vec<ValidationError>) {
    let mut bound = |field: &str, value: u32, lo: u32, hi: u32| {
        if !(lo..=hi).contains(&value) {
            findings.push(ValidationError::error(format!(
                "target group '{}': {} {} outside {}..={}",
                id, field, value, lo, hi
            )));
        }
    };
    bound("healthy threshold", hc.healthy_threshold, 2, 10);
    bound("unhealthy threshold", hc.unhealthy_threshold, 2, 10);
    bound("timeout", hc.timeout_secs, 2, 120);
    bound("interval", hc.interval_secs, 5, 300);

    if hc.interval_secs <= hc.timeout_secs {
        findings.push(ValidationError::error(format!(
            "target group '{}': interval {}s must exceed timeout {}s",
            id, hc.interval_secs, hc.timeout_secs
        )));
    }
    if !hc.path.starts_with('/') {
        findings.push(ValidationError::error(format!(
            "target group '{}': health-check path '{}' must start with '/'",
            id, hc.path
        )));
    }
    if !http_codes_valid(&hc.healthy_http_codes) {
        findings.push(ValidationError::error(format!(
            "target group '{}': invalid success codes '{}'",
            id, hc.healthy_http_codes
        )));
    }
}

/// Comma-separated codes or ranges, each within 200..=499.
fn http_codes_valid(codes: &str) -> bool {
    let in_range = |c: u16| (200..=499).contains(&c);
    codes.split(',').all(|part| {
        let Some(caps) = HTTP_CODE.captures(part.trim()) else {
            return false;
        };
        let low: u16 = caps[1].parse().unwrap_or(0);
        let high: u16 = caps.get(2).map_or(low, |m| m.as_str().parse().unwrap_or(0));
        in_range(low) && in_range(high) && low <= high
    })
}

fn check_capacity(id: &str, capacity: &Capacity, findings: &mut Vec<ValidationError>) {
    if !capacity.is_consistent() {
        let desired = capacity
            .desired
            .map_or_else(|| "unset".to_string(), |d| d.to_string());
        findings.push(ValidationError::error(format!(
            "auto-scaling group '{}': capacity must satisfy min <= desired <= max (min {}, desired {}, max {})",
            id, capacity.min, desired, capacity.max
        )));
    }
    if capacity.max == 0 {
        findings.push(ValidationError::error(format!(
            "auto-scaling group '{}': max capacity is 0",
            id
        )));
    }
}

/// Warn when instances stay exempt from health replacement far longer than
/// the load balancer takes to mark them unhealthy.
fn check_grace_period(
    stack: &Stack,
    id: &str,
    asg: &AutoScalingGroup,
    findings: &mut Vec<ValidationError>,
) {
    for tg_id in &asg.target_groups {
        let Some(tg) = stack.target_group(tg_id) else {
            continue;
        };
        let window = tg
            .health_check
            .unhealthy_threshold
            .saturating_mul(tg.health_check.interval_secs);
        if asg.health_check.grace_secs > window.saturating_mul(GRACE_WARNING_FACTOR) {
            findings.push(ValidationError::warning(format!(
                "auto-scaling group '{}': grace period {}s exceeds {}x the {}s failure window of target group '{}'",
                id, asg.health_check.grace_secs, GRACE_WARNING_FACTOR, window, tg_id
            )));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::StackConfig;
    use crate::core::descriptor::sample_asg_alb_stack;
    use crate::core::keys::StaticKeyProvider;

    fn sample() -> Stack {
        sample_asg_alb_stack(&StackConfig::default(), &StaticKeyProvider("k".into())).unwrap()
    }

    fn errors(findings: &[ValidationError]) -> Vec<&str> {
        findings
            .iter()
            .filter(|f| f.is_error())
            .map(|f| f.message.as_str())
            .collect()
    }

    #[test]
    fn test_validate_sample_has_only_grace_warning() {
        let findings = validate_stack(&sample());
        assert!(is_valid(&findings), "{findings:?}");
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].severity, Severity::Warning);
        assert!(findings[0].message.contains("grace period 1800s"));
        assert!(findings[0].message.contains("90s failure window"));
    }

    #[test]
    fn test_validate_short_grace_no_warning() {
        let config = StackConfig {
            health_check_grace_minutes: 5,
            ..StackConfig::default()
        };
        let stack = sample_asg_alb_stack(&config, &StaticKeyProvider("k".into())).unwrap();
        assert!(validate_stack(&stack).is_empty());
    }

    #[test]
    fn test_validate_capacity_inverted() {
        let config = StackConfig {
            capacity: Capacity {
                min: 3,
                desired: Some(1),
                max: 2,
            },
            ..StackConfig::default()
        };
        let stack = sample_asg_alb_stack(&config, &StaticKeyProvider("k".into())).unwrap();
        let findings = validate_stack(&stack);
        assert!(!is_valid(&findings));
        assert!(errors(&findings)[0].contains("min <= desired <= max"));
    }

    #[test]
    fn test_validate_dangling_reference() {
        let mut stack = sample();
        stack.constructs.shift_remove("KeyPair");
        let findings = validate_stack(&stack);
        assert!(errors(&findings)
            .iter()
            .any(|m| m.contains("references unknown key_pair 'KeyPair'")));
    }

    #[test]
    fn test_validate_wrong_kind() {
        let mut stack = sample();
        if let Some(Construct::Listener(l)) = stack.constructs.get_mut("Listener") {
            l.default_action = ListenerAction::Forward {
                target_group: "Elb".into(),
            };
        }
        let findings = validate_stack(&stack);
        assert!(errors(&findings)
            .iter()
            .any(|m| m.contains("but it is a load_balancer")));
    }

    #[test]
    fn test_validate_health_check_bounds() {
        let mut stack = sample();
        if let Some(Construct::TargetGroup(tg)) = stack.constructs.get_mut("TargetGroup") {
            tg.health_check.timeout_secs = 30;
            tg.health_check.interval_secs = 30;
            tg.health_check.healthy_threshold = 1;
        }
        let errs = validate_stack(&stack);
        let errs = errors(&errs);
        assert!(errs.iter().any(|m| m.contains("must exceed timeout")));
        assert!(errs.iter().any(|m| m.contains("healthy threshold 1 outside 2..=10")));
    }

    #[test]
    fn test_validate_http_codes() {
        assert!(http_codes_valid("200-299"));
        assert!(http_codes_valid("200,202"));
        assert!(http_codes_valid("200, 301-302"));
        assert!(!http_codes_valid("199"));
        assert!(!http_codes_valid("299-200"));
        assert!(!http_codes_valid("500"));
        assert!(!http_codes_valid("2xx"));
        assert!(!http_codes_valid(""));
    }

    #[test]
    fn test_validate_isolated_lb_subnet() {
        let mut stack = sample();
        if let Some(Construct::LoadBalancer(lb)) = stack.constructs.get_mut("Elb") {
            lb.subnets[1].subnet = "Private".into();
        }
        let findings = validate_stack(&stack);
        assert!(errors(&findings)
            .iter()
            .any(|m| m.contains("placed in private-isolated subnet 'Private'")));
    }

    #[test]
    fn test_validate_single_public_subnet() {
        let mut stack = sample();
        if let Some(Construct::Network(n)) = stack.constructs.get_mut("Vpc") {
            n.subnets.retain(|s| s.name != "Public2");
        }
        let findings = validate_stack(&stack);
        let errs = errors(&findings);
        assert!(errs.iter().any(|m| m.contains("1 public subnet(s)")));
        assert!(errs.iter().any(|m| m.contains("unknown subnet 'Public2'")));
    }

    #[test]
    fn test_validate_subnets_do_not_fit() {
        let config = StackConfig {
            vpc_cidr: "10.0.0.0/23".into(),
            ..StackConfig::default()
        };
        let stack = sample_asg_alb_stack(&config, &StaticKeyProvider("k".into())).unwrap();
        let findings = validate_stack(&stack);
        assert!(errors(&findings).iter().any(|m| m.contains("no room")));
    }

    #[test]
    fn test_validate_construct_id() {
        let mut stack = sample();
        let kp = stack.constructs.shift_remove("KeyPair").unwrap();
        stack.constructs.insert("key-pair".into(), kp);
        let findings = validate_stack(&stack);
        assert!(errors(&findings)
            .iter()
            .any(|m| m.contains("'key-pair' must be alphanumeric")));
    }

    #[test]
    fn test_validate_output_kind() {
        let mut stack = sample();
        if let Some(o) = stack.outputs.get_mut("ASGName") {
            o.construct = "Elb".into();
        }
        let findings = validate_stack(&stack);
        assert!(errors(&findings)
            .iter()
            .any(|m| m.contains("output 'ASGName' needs auto_scaling_group 'Elb'")));
    }

    #[test]
    fn test_validate_display() {
        let w = ValidationError::warning("slow".into());
        assert_eq!(w.to_string(), "warning: slow");
        assert!(!w.is_error());
    }
}
