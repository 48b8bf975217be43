//! Cluster-based matching: one cluster per root of the final time point,
//! grown backward in time.

use crate::model::{Point, Root, RootRef, Snapshot};
use crate::tracking::metric::mean_pointwise;
use std::collections::HashMap;
use tracing::debug;

/// Position of a root in the series: time index plus address in its snapshot.
pub(crate) type Member = (usize, RootRef);

#[derive(Debug, Clone)]
struct RootCluster {
    order: u32,
    /// Members in assignment order, i.e. descending time
    members: Vec<Member>,
    shapes: Vec<Vec<Point>>,
    insertion_sum: (f64, f64),
    num_insertions: usize,
    /// Child count of the most recently assigned member
    latest_children: usize,
}

impl RootCluster {
    fn seed(member: Member, root: &Root) -> Self {
        let mut cluster = Self {
            order: root.order(),
            members: Vec::new(),
            shapes: Vec::new(),
            insertion_sum: (0.0, 0.0),
            num_insertions: 0,
            latest_children: root.num_children(),
        };
        cluster.add(member, root);
        cluster
    }

    fn add(&mut self, member: Member, root: &Root) {
        if let Some(insertion) = root.geometry().insertion_point() {
            self.insertion_sum.0 += insertion.x;
            self.insertion_sum.1 += insertion.y;
            self.num_insertions += 1;
        }
        self.members.push(member);
        self.shapes.push(root.geometry().points());
        self.latest_children = root.num_children();
    }

    fn centroid(&self) -> Option<Point> {
        (self.num_insertions > 0).then(|| {
            let n = self.num_insertions as f64;
            Point::new(self.insertion_sum.0 / n, self.insertion_sum.1 / n)
        })
    }

    /// Weighted sum of centroid distance and mean shape distance to the members.
    fn score(&self, root: &Root, centroid_weight: f64, shape_weight: f64) -> f64 {
        let (Some(insertion), Some(centroid)) = (root.geometry().insertion_point(), self.centroid()) else {
            return f64::INFINITY;
        };

        let points = root.geometry().points();
        let shape = self.shapes.iter()
            .map(|shape| mean_pointwise(&points, shape))
            .sum::<f64>() / self.shapes.len() as f64;

        centroid_weight * insertion.distance(&centroid) + shape_weight * shape
    }
}


// =#========================================================================#=
// CLUSTER ASSIGNMENT
// =#========================================================================#=
/// Assignment of the roots of a series to clusters.
///
/// Every root of the final time point seeds one cluster. Walking backward,
/// each root joins the same-order cluster with the lowest score, unless it
/// has more children than the member last added to that cluster: a root
/// cannot lose laterals as time moves forward.
#[derive(Debug, Clone, Default)]
pub(crate) struct ClusterAssignment {
    clusters: Vec<RootCluster>,
    membership: HashMap<Member, usize>,
}

impl ClusterAssignment {
    /// Clusters the roots of `snapshots`, ordered by ascending time.
    pub(crate) fn build(snapshots: &[&Snapshot], centroid_weight: f64, shape_weight: f64) -> Self {
        let mut assignment = Self::default();
        let Some((last, earlier)) = snapshots.split_last() else {
            return assignment;
        };

        let last_index = earlier.len();
        for (root_ref, root) in last.roots() {
            assignment.membership.insert((last_index, root_ref), assignment.clusters.len());
            assignment.clusters.push(RootCluster::seed((last_index, root_ref), root));
        }

        for (time_index, snapshot) in earlier.iter().enumerate().rev() {
            for (root_ref, root) in snapshot.roots() {
                let best = assignment.clusters.iter()
                    .enumerate()
                    .filter(|(_, cluster)| cluster.order == root.order())
                    .map(|(index, cluster)| (index, cluster.score(root, centroid_weight, shape_weight)))
                    .filter(|(_, score)| score.is_finite())
                    .min_by(|a, b| a.1.total_cmp(&b.1));

                match best {
                    Some((index, _)) if root.num_children() <= assignment.clusters[index].latest_children => {
                        assignment.clusters[index].add((time_index, root_ref), root);
                        assignment.membership.insert((time_index, root_ref), index);
                    }
                    Some((index, _)) => debug!(
                        id = root.id(), time_index, cluster = index,
                        "root has more children than its cluster's later member, not clustered"
                    ),
                    None => debug!(id = root.id(), time_index, "no cluster of matching order"),
                }
            }
        }

        assignment
    }

    pub(crate) fn num_clusters(&self) -> usize {
        self.clusters.len()
    }

    /// The member of `member`'s cluster at the nearest later time point.
    pub(crate) fn later_member(&self, member: Member) -> Option<Member> {
        let cluster = &self.clusters[*self.membership.get(&member)?];
        cluster.members.iter()
            .filter(|(time_index, _)| *time_index > member.0)
            .min_by_key(|(time_index, _)| *time_index)
            .copied()
    }
}
