use std::collections::BTreeMap;

use crate::collision::contact::FixtureKey;
use crate::geometry::Aabb;
use crate::math::Vec2;

use super::{ray_hits_aabb, BroadPhase, Fattening};

/// O(n²) reference broad phase. Used as the oracle in tests and is fine
/// for a handful of fixtures.
#[derive(Debug, Clone, Default)]
pub struct BruteForce {
    proxies: BTreeMap<FixtureKey, Aabb>,
    fattening: Fattening,
}

impl BruteForce {
    pub fn new(fattening: Fattening) -> Self {
        Self {
            proxies: BTreeMap::new(),
            fattening,
        }
    }
}

impl BroadPhase for BruteForce {
    fn insert(&mut self, key: FixtureKey, aabb: Aabb) {
        self.proxies.insert(key, self.fattening.fatten(aabb, Vec2::ZERO));
    }

    fn remove(&mut self, key: FixtureKey) -> bool {
        self.proxies.remove(&key).is_some()
    }

    fn update(&mut self, key: FixtureKey, aabb: Aabb, displacement: Vec2) -> bool {
        let fattening = self.fattening;
        match self.proxies.get_mut(&key) {
            Some(fat) if fat.contains_aabb(aabb) => false,
            Some(fat) => {
                *fat = fattening.fatten(aabb, displacement);
                true
            }
            None => {
                self.insert(key, aabb);
                true
            }
        }
    }

    fn contains(&self, key: FixtureKey) -> bool {
        self.proxies.contains_key(&key)
    }

    fn fat_aabb(&self, key: FixtureKey) -> Option<Aabb> {
        self.proxies.get(&key).copied()
    }

    fn query_pairs(&self) -> Vec<(FixtureKey, FixtureKey)> {
        let proxies: Vec<(&FixtureKey, &Aabb)> = self.proxies.iter().collect();
        let mut pairs = Vec::new();
        for (i, (&a, aabb_a)) in proxies.iter().enumerate() {
            for (&b, aabb_b) in &proxies[i + 1..] {
                if aabb_a.intersects(**aabb_b) {
                    pairs.push((a, b));
                }
            }
        }
        pairs
    }

    fn query_aabb(&self, aabb: Aabb) -> Vec<FixtureKey> {
        self.proxies
            .iter()
            .filter(|(_, fat)| fat.intersects(aabb))
            .map(|(&key, _)| key)
            .collect()
    }

    fn query_ray(&self, origin: Vec2, direction: Vec2, max_distance: f32) -> Vec<FixtureKey> {
        self.proxies
            .iter()
            .filter(|(_, &fat)| ray_hits_aabb(fat, origin, direction, max_distance))
            .map(|(&key, _)| key)
            .collect()
    }

    fn len(&self) -> usize {
        self.proxies.len()
    }

    fn clear(&mut self) {
        self.proxies.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::check_contract;
    use super::*;

    #[test]
    fn test_contract() {
        check_contract(&mut BruteForce::new(Fattening::default()));
    }
}
