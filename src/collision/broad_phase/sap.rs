use std::cmp::Ordering;
use std::collections::HashMap;

use crate::collision::contact::FixtureKey;
use crate::geometry::Aabb;
use crate::math::Vec2;

use super::{ray_hits_aabb, BroadPhase, Fattening};

#[derive(Debug, Clone, Copy)]
struct Proxy {
    key: FixtureKey,
    aabb: Aabb,
}

impl Proxy {
    /// Sort order along the sweep axis; the key breaks ties so the order
    /// never depends on insertion history
    fn cmp_sweep(&self, other: &Proxy) -> Ordering {
        self.aabb
            .min
            .x
            .total_cmp(&other.aabb.min.x)
            .then(self.key.cmp(&other.key))
    }
}

/// Sweep-and-prune along the x axis.
///
/// Proxies live in stable slots; `order` holds slot indices sorted by the
/// lower x bound. Moved proxies are taken out of the order and reinserted at
/// their new position, so the sweep never needs a full sort.
#[derive(Debug, Clone, Default)]
pub struct SweepAndPrune {
    slots: Vec<Option<Proxy>>,
    free_slots: Vec<usize>,
    lookup: HashMap<FixtureKey, usize>,
    order: Vec<usize>,
    fattening: Fattening,
}

impl SweepAndPrune {
    pub fn new(fattening: Fattening) -> Self {
        Self {
            fattening,
            ..Self::default()
        }
    }

    fn proxy(&self, slot: usize) -> &Proxy {
        match &self.slots[slot] {
            Some(proxy) => proxy,
            None => unreachable!("sorted order references a free slot"),
        }
    }

    /// Position of `proxy` in the sorted order (or where it would go)
    fn order_position(&self, proxy: &Proxy) -> usize {
        self.order
            .partition_point(|&slot| self.proxy(slot).cmp_sweep(proxy) == Ordering::Less)
    }

    fn link(&mut self, slot: usize) {
        let proxy = *self.proxy(slot);
        let position = self.order_position(&proxy);
        self.order.insert(position, slot);
    }

    fn unlink(&mut self, slot: usize) {
        let proxy = *self.proxy(slot);
        let position = self.order_position(&proxy);
        debug_assert_eq!(self.order.get(position), Some(&slot));
        self.order.remove(position);
    }

    fn sorted_proxies(&self) -> impl Iterator<Item = &Proxy> + '_ {
        self.order.iter().map(move |&slot| self.proxy(slot))
    }
}

impl BroadPhase for SweepAndPrune {
    fn insert(&mut self, key: FixtureKey, aabb: Aabb) {
        if self.contains(key) {
            self.remove(key);
        }
        let proxy = Proxy {
            key,
            aabb: self.fattening.fatten(aabb, Vec2::ZERO),
        };
        let slot = match self.free_slots.pop() {
            Some(slot) => {
                self.slots[slot] = Some(proxy);
                slot
            }
            None => {
                self.slots.push(Some(proxy));
                self.slots.len() - 1
            }
        };
        self.lookup.insert(key, slot);
        self.link(slot);
    }

    fn remove(&mut self, key: FixtureKey) -> bool {
        let Some(slot) = self.lookup.remove(&key) else {
            return false;
        };
        self.unlink(slot);
        self.slots[slot] = None;
        self.free_slots.push(slot);
        true
    }

    fn update(&mut self, key: FixtureKey, aabb: Aabb, displacement: Vec2) -> bool {
        let Some(&slot) = self.lookup.get(&key) else {
            self.insert(key, aabb);
            return true;
        };
        if self.proxy(slot).aabb.contains_aabb(aabb) {
            return false;
        }
        self.unlink(slot);
        let fat = self.fattening.fatten(aabb, displacement);
        if let Some(proxy) = self.slots[slot].as_mut() {
            proxy.aabb = fat;
        }
        self.link(slot);
        true
    }

    fn contains(&self, key: FixtureKey) -> bool {
        self.lookup.contains_key(&key)
    }

    fn fat_aabb(&self, key: FixtureKey) -> Option<Aabb> {
        self.lookup.get(&key).map(|&slot| self.proxy(slot).aabb)
    }

    fn query_pairs(&self) -> Vec<(FixtureKey, FixtureKey)> {
        let sorted: Vec<&Proxy> = self.sorted_proxies().collect();
        let mut pairs = Vec::new();
        for (i, a) in sorted.iter().enumerate() {
            for b in &sorted[i + 1..] {
                if b.aabb.min.x > a.aabb.max.x {
                    break;
                }
                if a.aabb.min.y <= b.aabb.max.y && a.aabb.max.y >= b.aabb.min.y {
                    pairs.push(if a.key < b.key { (a.key, b.key) } else { (b.key, a.key) });
                }
            }
        }
        pairs.sort_unstable();
        pairs
    }

    fn query_aabb(&self, aabb: Aabb) -> Vec<FixtureKey> {
        let mut keys: Vec<FixtureKey> = self
            .sorted_proxies()
            .take_while(|p| p.aabb.min.x <= aabb.max.x)
            .filter(|p| p.aabb.intersects(aabb))
            .map(|p| p.key)
            .collect();
        keys.sort_unstable();
        keys
    }

    fn query_ray(&self, origin: Vec2, direction: Vec2, max_distance: f32) -> Vec<FixtureKey> {
        let mut keys: Vec<FixtureKey> = self
            .sorted_proxies()
            .filter(|p| ray_hits_aabb(p.aabb, origin, direction, max_distance))
            .map(|p| p.key)
            .collect();
        keys.sort_unstable();
        keys
    }

    fn len(&self) -> usize {
        self.lookup.len()
    }

    fn clear(&mut self) {
        self.slots.clear();
        self.free_slots.clear();
        self.lookup.clear();
        self.order.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{boxed, check_contract, key};
    use super::*;

    #[test]
    fn test_contract() {
        check_contract(&mut SweepAndPrune::new(Fattening::default()));
    }

    #[test]
    fn test_order_stays_sorted_after_moves() {
        let mut sap = SweepAndPrune::new(Fattening::new(0.0, 0.0));
        for i in 0..6 {
            sap.insert(key(i), boxed(i as f32 * 3.0, 0.0, 0.5));
        }
        // move the first proxy past everything else
        sap.update(key(0), boxed(20.0, 0.0, 0.5), Vec2::ZERO);
        sap.update(key(5), boxed(-4.0, 0.0, 0.5), Vec2::ZERO);

        let xs: Vec<f32> = sap.sorted_proxies().map(|p| p.aabb.min.x).collect();
        assert!(xs.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(sap.sorted_proxies().next().map(|p| p.key), Some(key(5)));

        sap.update(key(1), boxed(20.5, 0.0, 0.5), Vec2::ZERO);
        assert_eq!(sap.query_pairs(), vec![(key(0), key(1))]);
    }
}
