use std::sync::Arc;

use tamon::truth::{ClockTags, Comparison, Degree, Norm, Substitution, Substitutions, Tolerance, Truth};

const NORMS: [Norm; 3] = [Norm::Godel, Norm::Product, Norm::Lukasiewicz];

fn degrees() -> Vec<Degree> {
    [0.0, 0.1, 0.25, 0.5, 0.333333, 0.75, 0.999999, 1.0]
        .into_iter()
        .map(Degree::new)
        .collect()
}

#[test]
fn negation_is_an_involution() {
    for q in degrees() {
        assert_eq!(q.negate().negate(), q);
    }
    assert!(true.negate().negate());
    assert!(!false.negate().negate());
}

#[test]
fn norms_are_commutative_with_their_units() {
    for norm in NORMS {
        for a in degrees() {
            assert_eq!(a.t_norm(Degree::ONE, norm), a, "{norm:?} t-norm unit");
            assert_eq!(a.s_norm(Degree::ZERO, norm), a, "{norm:?} s-norm unit");
            for b in degrees() {
                assert_eq!(a.t_norm(b, norm), b.t_norm(a, norm));
                assert_eq!(a.s_norm(b, norm), b.s_norm(a, norm));
                assert!(a.t_norm(b, norm) <= a.s_norm(b, norm));
            }
        }
    }
}

#[test]
fn norm_families() {
    let half = Degree::new(0.5);
    assert_eq!(half.t_norm(half, Norm::Godel), half);
    assert_eq!(half.t_norm(half, Norm::Product), Degree::new(0.25));
    assert_eq!(half.s_norm(half, Norm::Product), Degree::new(0.75));
    assert_eq!(half.t_norm(half, Norm::Lukasiewicz), Degree::ZERO);
    assert_eq!(Degree::new(0.7).s_norm(Degree::new(0.6), Norm::Lukasiewicz), Degree::ONE);
    // booleans ignore the norm
    for norm in NORMS {
        assert!(true.t_norm(true, norm));
        assert!(!true.t_norm(false, norm));
        assert!(false.s_norm(true, norm));
    }
}

#[test]
fn degrees_hold_when_positive() {
    assert!(!Degree::ZERO.holds());
    assert!(Degree::new(0.000001).holds());
    assert!(Degree::top().holds());
    assert_eq!(Degree::default(), Degree::ONE);
    assert_eq!(Degree::new(2.0), Degree::ONE);
    assert_eq!(Degree::new(-1.0), Degree::ZERO);
    assert_eq!(Degree::new(0.75).to_string(), "Q(0.75)");
    assert!(<bool as Truth>::from_degree(Degree::new(0.2)));
}

#[test]
fn tolerance_fades_linearly() {
    let band = Tolerance::new(9);
    assert_eq!(band.equal(100, 100), Degree::ONE);
    assert_eq!(band.equal(100, 105), Degree::new(0.5));
    assert_eq!(band.equal(100, 110), Degree::ZERO);
    assert_eq!(band.less(99, 100), Degree::ONE);
    assert_eq!(band.less(100, 100), Degree::new(0.9));
    assert_eq!(band.less(104, 100), Degree::new(0.5));
    assert_eq!(band.less(109, 100), Degree::ZERO);
    let crisp = Tolerance::new(0);
    assert_eq!(crisp.equal(3, 3), Degree::ONE);
    assert_eq!(crisp.equal(3, 4), Degree::ZERO);
    assert_eq!(crisp.less(3, 3), Degree::ZERO);
}

#[test]
fn comparisons_dispatch_per_clock() {
    let mut substitutions = Substitutions::new();
    substitutions.register(0, Arc::new(Tolerance::new(9)));
    let norm = Norm::Godel;
    let mut softened = ClockTags::new();
    softened.insert(0);
    let mut crisp = ClockTags::new();
    crisp.insert(1);
    let untagged = ClockTags::new();

    let q: Degree = substitutions.compare(&softened, Comparison::Lt, 104, 100, norm);
    assert_eq!(q, Degree::new(0.5));
    let q: Degree = substitutions.compare(&crisp, Comparison::Lt, 104, 100, norm);
    assert_eq!(q, Degree::ZERO);
    let q: Degree = substitutions.compare(&untagged, Comparison::Ge, 104, 100, norm);
    assert_eq!(q, Degree::ONE);
    // a value derived from both clocks takes the more lenient reading
    let both = &softened | &crisp;
    let q: Degree = substitutions.compare(&both, Comparison::Lt, 104, 100, norm);
    assert_eq!(q, Degree::new(0.5));
    // != and > are derived from == and <
    let q: Degree = substitutions.compare(&softened, Comparison::Ne, 100, 105, norm);
    assert_eq!(q, Degree::new(0.5));
    let q: Degree = substitutions.compare(&softened, Comparison::Gt, 100, 104, norm);
    assert_eq!(q, Degree::new(0.5));
    let b: bool = substitutions.compare(&softened, Comparison::Le, 104, 100, norm);
    assert!(b);
    let b: bool = substitutions.compare(&crisp, Comparison::Le, 104, 100, norm);
    assert!(!b);
}
