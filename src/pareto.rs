use std::fmt::Display;

/// Decides whether `left` is better than `right` in at least one criterion. Two elements dominate
/// each other mutually when both directions return true.
pub trait ParetoComparator<T> {
    fn left_dominance_exist(&self, left: &T, right: &T) -> bool;
}

impl<T, F: Fn(&T, &T) -> bool> ParetoComparator<T> for F {
    fn left_dominance_exist(&self, left: &T, right: &T) -> bool {
        self(left, right)
    }
}

pub trait ParetoSetEventListener<T> {
    fn notify_element_accepted(&mut self, _new_element: &T) {}
    fn notify_element_dropped(&mut self, _element: &T, _dropped_by: &T) {}
    fn notify_element_rejected(&mut self, _element: &T, _rejected_by: &T) {}
}

impl<T> ParetoSetEventListener<T> for () {}

/// A set where no element dominates another. The first element added wins ties.
#[derive(Clone, Debug)]
pub struct ParetoSet<T, C> {
    elements: Vec<T>,
    comparator: C,
}

impl<T, C: ParetoComparator<T>> ParetoSet<T, C> {
    pub fn new(comparator: C) -> Self {
        Self { elements: Vec::new(), comparator }
    }

    pub fn add(&mut self, new_value: T) -> bool {
        self.add_with_listener(new_value, &mut ())
    }

    // Returns true if the value was added <=> the set was modified.
    pub fn add_with_listener<L: ParetoSetEventListener<T>>(&mut self, new_value: T, listener: &mut L) -> bool {
        if self.elements.is_empty() {
            listener.notify_element_accepted(&new_value);
            self.elements.push(new_value);
            return true;
        }

        let mut mutual_dominance_exist = false;
        let mut equivalent_vector_exist = false;

        for i in 0..self.elements.len() {
            let it = &self.elements[i];
            let left_dominance = self.comparator.left_dominance_exist(&new_value, it);
            let right_dominance = self.comparator.left_dominance_exist(it, &new_value);

            if left_dominance && right_dominance {
                mutual_dominance_exist = true;
            } else if left_dominance {
                self.remove_dominated_elements_and_add(i, new_value, listener);
                return true;
            } else if right_dominance {
                listener.notify_element_rejected(&new_value, it);
                return false;
            } else {
                equivalent_vector_exist = true;
            }
        }

        if mutual_dominance_exist && !equivalent_vector_exist {
            listener.notify_element_accepted(&new_value);
            self.elements.push(new_value);
            return true;
        }

        // No dominance found, the new value is equivalent to an existing element.
        listener.notify_element_rejected(&new_value, &self.elements[0]);
        false
    }

    /// Returns what `add` would return, without changing the set.
    pub fn qualify(&self, new_value: &T) -> bool {
        if self.elements.is_empty() {
            return true;
        }
        let mut mutual_dominance_exist = false;
        let mut equivalent_vector_exist = false;

        for it in &self.elements {
            let left_dominance = self.comparator.left_dominance_exist(new_value, it);
            let right_dominance = self.comparator.left_dominance_exist(it, new_value);

            if left_dominance && right_dominance {
                mutual_dominance_exist = true;
            } else if left_dominance {
                return true;
            } else if right_dominance {
                return false;
            } else {
                equivalent_vector_exist = true;
            }
        }
        mutual_dominance_exist && !equivalent_vector_exist
    }

    // The element at `index` is dominated by the new value. Remove it, and any later element the
    // new value dominates, keeping the order of the rest.
    fn remove_dominated_elements_and_add<L: ParetoSetEventListener<T>>(&mut self, index: usize, new_value: T, listener: &mut L) {
        listener.notify_element_dropped(&self.elements[index], &new_value);
        let mut keep = index;
        for j in (index + 1)..self.elements.len() {
            if self.left_dominance_only(&new_value, &self.elements[j]) {
                listener.notify_element_dropped(&self.elements[j], &new_value);
            } else {
                self.elements.swap(keep, j);
                keep += 1;
            }
        }
        self.elements.truncate(keep);

        debug_assert!(
            self.elements.iter().all(|it| !self.left_dominance_only(it, &new_value)),
            "Pareto set element dominates the element replacing it"
        );
        listener.notify_element_accepted(&new_value);
        self.elements.push(new_value);
    }

    fn left_dominance_only(&self, left: &T, right: &T) -> bool {
        self.comparator.left_dominance_exist(left, right) && !self.comparator.left_dominance_exist(right, left)
    }

    pub fn comparator(&self) -> &C {
        &self.comparator
    }
}

impl<T, C> ParetoSet<T, C> {
    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.elements.iter()
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&T> {
        self.elements.get(index)
    }

    pub fn as_slice(&self) -> &[T] {
        &self.elements
    }

    pub fn clear(&mut self) {
        self.elements.clear();
    }

    pub fn into_vec(self) -> Vec<T> {
        self.elements
    }
}

impl<'a, T, C> IntoIterator for &'a ParetoSet<T, C> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.elements.iter()
    }
}

impl<T: Display, C> Display for ParetoSet<T, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{{")?;
        for (i, element) in self.elements.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{element}")?;
        }
        write!(f, "}}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    struct Vector {
        name: &'static str,
        v1: i32,
        v2: i32,
    }

    impl Display for Vector {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "{}[{}, {}]", self.name, self.v1, self.v2)
        }
    }

    fn vector(name: &'static str, v1: i32, v2: i32) -> Vector {
        Vector { name, v1, v2 }
    }

    fn less_less(l: &Vector, r: &Vector) -> bool {
        l.v1 < r.v1 || l.v2 < r.v2
    }

    fn less_different(l: &Vector, r: &Vector) -> bool {
        l.v1 < r.v1 || l.v2 != r.v2
    }

    #[derive(Default)]
    struct DropListener {
        dropped: Vec<&'static str>,
    }

    impl ParetoSetEventListener<Vector> for DropListener {
        fn notify_element_dropped(&mut self, element: &Vector, _dropped_by: &Vector) {
            self.dropped.push(element.name);
        }
    }

    #[test]
    fn first_element_is_always_added() {
        let mut set = ParetoSet::new(less_less);
        assert!(set.add(vector("V0", 5, 5)));
        assert_eq!(set.to_string(), "{V0[5, 5]}");
    }

    #[test]
    fn equal_element_is_rejected() {
        let mut set = ParetoSet::new(less_less);
        set.add(vector("V0", 5, 5));
        assert!(!set.qualify(&vector("V1", 5, 5)));
        assert!(!set.add(vector("V1", 5, 5)));
        assert_eq!(set.to_string(), "{V0[5, 5]}");
    }

    #[test]
    fn dominated_elements_are_dropped_in_order() {
        let mut set = ParetoSet::new(less_less);
        set.add(vector("V0", 5, 1));
        set.add(vector("V1", 3, 3));
        set.add(vector("V2", 1, 5));
        set.add(vector("V3", 4, 2));

        let mut listener = DropListener::default();
        assert!(set.add_with_listener(vector("X", 3, 2), &mut listener));
        assert_eq!(listener.dropped, vec!["V1", "V3"]);
        assert_eq!(set.to_string(), "{V0[5, 1], V2[1, 5], X[3, 2]}");
    }

    #[test]
    fn dominated_element_is_rejected() {
        let mut set = ParetoSet::new(less_less);
        set.add(vector("V0", 5, 1));
        set.add(vector("V1", 1, 5));
        assert!(!set.qualify(&vector("X", 6, 1)));
        assert!(!set.add(vector("X", 6, 1)));
        assert!(set.qualify(&vector("Y", 3, 3)));
        assert!(set.add(vector("Y", 3, 3)));
        assert_eq!(set.len(), 3);
    }

    #[test]
    fn different_criterion_keeps_both() {
        let mut set = ParetoSet::new(less_different);
        set.add(vector("V0", 5, 1));
        assert!(set.add(vector("V1", 6, 2)));
        // Better on v1, equal on v2: dominates V0 only.
        assert!(set.add(vector("V2", 4, 1)));
        assert_eq!(set.to_string(), "{V1[6, 2], V2[4, 1]}");
    }

    #[test]
    fn mutual_and_equivalent_is_rejected() {
        let mut set = ParetoSet::new(less_less);
        set.add(vector("V0", 1, 5));
        set.add(vector("V1", 5, 1));
        // Mutual with V0, but equivalent to nothing else and dominated by nothing.
        assert!(set.add(vector("V2", 2, 4)));
        // Equal to V2 and mutual with the others.
        assert!(!set.add(vector("V3", 2, 4)));
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        fn dominates(l: &(i32, i32, i32), r: &(i32, i32, i32)) -> bool {
            let better = |l: &(i32, i32, i32), r: &(i32, i32, i32)| l.0 < r.0 || l.1 < r.1 || l.2 < r.2;
            better(l, r) && !better(r, l)
        }

        proptest! {
            #[test]
            fn no_element_dominates_another(values in prop::collection::vec((0..20i32, 0..20i32, 0..20i32), 0..60)) {
                let mut set = ParetoSet::new(|l: &(i32, i32, i32), r: &(i32, i32, i32)| l.0 < r.0 || l.1 < r.1 || l.2 < r.2);
                for value in &values {
                    let qualified = set.qualify(value);
                    prop_assert_eq!(qualified, set.add(*value));
                }
                for l in set.iter() {
                    for r in set.iter() {
                        prop_assert!(!dominates(l, r), "{:?} dominates {:?}", l, r);
                    }
                }
                // Every rejected value is dominated by, or equal to, a member.
                for value in &values {
                    prop_assert!(set.iter().any(|it| it == value || dominates(it, value)));
                }
            }
        }
    }
}
