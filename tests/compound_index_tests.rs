//! Tests for compound index scans
//!
//! These tests verify:
//! - Range operators over multi-component keys
//! - Bounds supplying fewer components than the key (prefix comparison)
//! - Ascending and descending walks over the same range
//! - Key-only scans that never load objects

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use vellumdb::btree::Direction;
use vellumdb::{
    compound, Collection, CollectionFile, CompoundValue, Config, IndexDefinition, Session,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Point {
    id: u64,
    a: i64,
    b: i64,
    c: i64,
}

impl Point {
    fn new(id: u64, a: i64, b: i64, c: i64) -> Self {
        Self { id, a, b, c }
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

fn setup_file() -> (Session, Arc<CollectionFile>) {
    let session = Session::in_memory(Config::builder().btree_degree(2).build()).unwrap();
    let file = session.collection_file("points").unwrap();
    (session, file)
}

fn two_component(file: &Arc<CollectionFile>) -> Collection<Point> {
    let definition =
        IndexDefinition::new(|p: &Point| (p.id,)).index("ab", |p: &Point| (p.a, p.b));
    let points = file.collection("pairs", definition).unwrap();
    for i in 1..=3 {
        points.persist(&Point::new(i as u64, i, i, 0)).unwrap();
    }
    points
}

fn three_component(file: &Arc<CollectionFile>) -> Collection<Point> {
    let definition =
        IndexDefinition::new(|p: &Point| (p.id,)).index("abc", |p: &Point| (p.a, p.b, p.c));
    let points = file.collection("triples", definition).unwrap();
    for i in 1..=3 {
        points.persist(&Point::new(i as u64, i, i, i)).unwrap();
    }
    points
}

fn ids(points: Vec<Point>) -> Vec<u64> {
    points.into_iter().map(|p| p.id).collect()
}

// =============================================================================
// Two-Component Range Tests
// =============================================================================

#[test]
fn test_greater_than() {
    let (_session, file) = setup_file();
    let points = two_component(&file);
    let ab = points.index("ab").unwrap();

    assert_eq!(ids(ab.greater_than((2, 2)).to_vec().unwrap()), vec![3]);
    assert_eq!(ids(ab.greater_than_or_equal((2, 2)).to_vec().unwrap()), vec![2, 3]);
}

#[test]
fn test_smaller_than() {
    let (_session, file) = setup_file();
    let points = two_component(&file);
    let ab = points.index("ab").unwrap();

    assert_eq!(ids(ab.smaller_than((2, 2)).to_vec().unwrap()), vec![1]);
    assert_eq!(ids(ab.smaller_than_or_equal((2, 2)).to_vec().unwrap()), vec![1, 2]);
}

#[test]
fn test_between_exclusive() {
    let (_session, file) = setup_file();
    let points = two_component(&file);
    let ab = points.index("ab").unwrap();

    assert_eq!(ids(ab.between((1, 1)).and((3, 3)).to_vec().unwrap()), vec![2]);
}

#[test]
fn test_between_inclusive() {
    let (_session, file) = setup_file();
    let points = two_component(&file);
    let ab = points.index("ab").unwrap();

    let scope = ab.between_including((1, 1)).and_including((3, 3));
    assert_eq!(ids(scope.to_vec().unwrap()), vec![1, 2, 3]);
    assert_eq!(ids(scope.descending().to_vec().unwrap()), vec![3, 2, 1]);
}

#[test]
fn test_between_mixed_bounds() {
    let (_session, file) = setup_file();
    let points = two_component(&file);
    let ab = points.index("ab").unwrap();

    assert_eq!(ids(ab.between_including((1, 1)).and((3, 3)).to_vec().unwrap()), vec![1, 2]);
    assert_eq!(ids(ab.between((1, 1)).and_including((3, 3)).to_vec().unwrap()), vec![2, 3]);
}

#[test]
fn test_empty_range() {
    let (_session, file) = setup_file();
    let points = two_component(&file);
    let ab = points.index("ab").unwrap();

    assert!(ab.between((2, 2)).and((2, 2)).to_vec().unwrap().is_empty());
    assert_eq!(ab.greater_than((3, 3)).count().unwrap(), 0);
    assert_eq!(ab.smaller_than((1, 1)).descending().count().unwrap(), 0);
}

// =============================================================================
// Prefix Bound Tests
// =============================================================================

#[test]
fn test_three_component_greater_than() {
    let (_session, file) = setup_file();
    let points = three_component(&file);
    let abc = points.index("abc").unwrap();

    assert_eq!(ids(abc.greater_than((2, 2, 1)).to_vec().unwrap()), vec![2, 3]);
}

#[test]
fn test_prefix_bound_skips_whole_prefix() {
    let (_session, file) = setup_file();
    let points = three_component(&file);
    let abc = points.index("abc").unwrap();

    assert_eq!(ids(abc.greater_than((2, 2)).to_vec().unwrap()), vec![3]);
    assert_eq!(ids(abc.greater_than_or_equal((2,)).to_vec().unwrap()), vec![2, 3]);
}

#[test]
fn test_prefix_upper_bound_descending() {
    let (_session, file) = setup_file();
    let points = three_component(&file);
    let abc = points.index("abc").unwrap();

    let scope = abc.smaller_than((3,)).descending();
    assert_eq!(scope.direction(), Direction::Descending);
    assert_eq!(ids(scope.to_vec().unwrap()), vec![2, 1]);
}

#[test]
fn test_equals_matches_prefix() {
    let (_session, file) = setup_file();
    let definition =
        IndexDefinition::new(|p: &Point| (p.id,)).index("abc", |p: &Point| (p.a, p.b, p.c));
    let points = file.collection("grid", definition).unwrap();
    let mut id = 0;
    for a in 0..3 {
        for b in 0..3 {
            id += 1;
            points.persist(&Point::new(id, a, b, a * b)).unwrap();
        }
    }
    let abc = points.index("abc").unwrap();

    let row: Vec<i64> = abc.equals((1,)).iter().unwrap().map(|p| p.unwrap().b).collect();
    assert_eq!(row, vec![0, 1, 2]);
    assert_eq!(abc.equals((2, 1)).count().unwrap(), 1);
    assert_eq!(abc.find((2, 2)).unwrap().map(|p| p.c), Some(4));
    assert!(abc.find((5,)).unwrap().is_none());
}

// =============================================================================
// Ordering Tests
// =============================================================================

#[test]
fn test_second_component_orders_ties() {
    let (_session, file) = setup_file();
    let definition =
        IndexDefinition::new(|p: &Point| (p.id,)).index("ab", |p: &Point| (p.a, p.b));
    let points = file.collection("ties", definition).unwrap();
    points.persist(&Point::new(1, 1, 9, 0)).unwrap();
    points.persist(&Point::new(2, 0, 5, 0)).unwrap();
    points.persist(&Point::new(3, 1, -4, 0)).unwrap();
    points.persist(&Point::new(4, 0, 7, 0)).unwrap();

    let ab = points.index("ab").unwrap();
    assert_eq!(ids(ab.all().to_vec().unwrap()), vec![2, 4, 3, 1]);
    assert_eq!(ids(ab.all().descending().to_vec().unwrap()), vec![1, 3, 4, 2]);
}

#[test]
fn test_scan_across_many_nodes() {
    let (_session, file) = setup_file();
    let definition = IndexDefinition::new(|p: &Point| (p.id,)).index("a", |p: &Point| (p.a,));
    let points = file.collection("many", definition).unwrap();
    for i in 0..200u64 {
        points.persist(&Point::new(i, (i * 7 % 200) as i64, 0, 0)).unwrap();
    }
    let a = points.index("a").unwrap();

    let values: Vec<i64> = a
        .between_including((50,))
        .and((60,))
        .iter()
        .unwrap()
        .map(|p| p.unwrap().a)
        .collect();
    assert_eq!(values, (50..60).collect::<Vec<_>>());

    let descending: Vec<i64> = a
        .smaller_than_or_equal((195,))
        .descending()
        .iter()
        .unwrap()
        .take(3)
        .map(|p| p.unwrap().a)
        .collect();
    assert_eq!(descending, vec![195, 194, 193]);
}

#[test]
fn test_scope_is_restartable() {
    let (_session, file) = setup_file();
    let points = two_component(&file);
    let ab = points.index("ab").unwrap();
    let scope = ab.greater_than((1, 1));

    assert_eq!(scope.count().unwrap(), 2);
    points.persist(&Point::new(4, 4, 4, 0)).unwrap();
    assert_eq!(scope.count().unwrap(), 3);
}

// =============================================================================
// Key Scan Tests
// =============================================================================

#[test]
fn test_keys_returns_compound_values() {
    let (_session, file) = setup_file();
    let points = two_component(&file);
    let ab = points.index("ab").unwrap();

    let keys: Vec<CompoundValue> = ab
        .greater_than_or_equal((2,))
        .keys()
        .unwrap()
        .collect::<vellumdb::Result<_>>()
        .unwrap();
    assert_eq!(keys, vec![compound!(2i64, 2i64), compound!(3i64, 3i64)]);
}

#[test]
fn test_primary_scope_keys() {
    let (_session, file) = setup_file();
    let points = two_component(&file);

    let keys: Vec<CompoundValue> = points
        .all()
        .descending()
        .keys()
        .unwrap()
        .collect::<vellumdb::Result<_>>()
        .unwrap();
    assert_eq!(keys, vec![compound!(3u64), compound!(2u64), compound!(1u64)]);
}
