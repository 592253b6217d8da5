//! Builders for small graphs and meshes shared by unit and integration tests.

use crate::comm::LocalCommunicator;
use crate::geometry::{Point3, Vector3};
use crate::graph::DistributedCellGraph;
use crate::mesh::{FaceGeometry, FarSide, Region, RegionKind, UnstructuredMesh};

/// Build one [`DistributedCellGraph`] per rank in a ring of `num_ranks`
/// single-cell ranks: rank `i` owns `"cell{i}"` and ghosts its two
/// neighbours `"cell{i-1}"` and `"cell{i+1}"` (indices mod `num_ranks`).
///
/// None of the returned graphs are finalized; call [`DistributedCellGraph::finalize`]
/// on each (typically on its own thread, since finalisation is collective).
///
/// # Panics
///
/// Panics if `num_ranks < 3` (a ring needs at least three distinct cells so
/// a rank's two neighbours aren't the same cell).
#[must_use]
pub fn ring_graph(num_ranks: usize) -> Vec<DistributedCellGraph<LocalCommunicator>> {
    assert!(num_ranks >= 3, "a ring needs at least three ranks");
    let comms = LocalCommunicator::cluster(num_ranks);
    let mut graphs: Vec<_> = comms.into_iter().map(DistributedCellGraph::new).collect();

    for (i, graph) in graphs.iter_mut().enumerate() {
        let prev = (i + num_ranks - 1) % num_ranks;
        let next = (i + 1) % num_ranks;
        let me = format!("cell{i}");
        let prev_label = format!("cell{prev}");
        let next_label = format!("cell{next}");

        graph.add_local_node(me.clone()).unwrap();
        graph.add_ghost_node(prev_label.clone()).unwrap();
        graph.add_ghost_node(next_label.clone()).unwrap();
        graph.add_undirected_edge(me.clone(), prev_label).unwrap();
        graph.add_undirected_edge(me, next_label).unwrap();
    }
    graphs
}

/// A single-rank, finalized corridor of `n` unit cubes laid end to end along
/// `+x`, each face between consecutive cubes an interior face and the two
/// ends closed off with wall boundaries.
///
/// # Panics
///
/// Panics if `n == 0`, or if mesh construction fails (it shouldn't for a
/// well-formed corridor).
#[must_use]
pub fn brick_corridor(n: usize) -> UnstructuredMesh<LocalCommunicator> {
    assert!(n > 0, "a corridor needs at least one cell");
    let mut comms = LocalCommunicator::cluster(1);
    let mut mesh = UnstructuredMesh::new(comms.remove(0));

    mesh.add_region("wall", Region { kind: RegionKind::Wall, ..Region::default() }).unwrap();

    for i in 0..n {
        let label = format!("c{i}");
        mesh.add_cell(label, true, Point3::new(i as f64 + 0.5, 0.5, 0.5), 1.0).unwrap();
    }

    let plane = |x: f64, prefix: &str, mesh: &mut UnstructuredMesh<LocalCommunicator>| {
        let coords = [(x, 0.0, 0.0), (x, 1.0, 0.0), (x, 1.0, 1.0), (x, 0.0, 1.0)];
        coords
            .iter()
            .enumerate()
            .map(|(j, &(px, py, pz))| {
                let label = format!("{prefix}{j}");
                mesh.add_vertex(label.clone(), Point3::new(px, py, pz)).unwrap();
                label
            })
            .collect::<Vec<_>>()
    };

    let left = plane(0.0, "x0_", &mut mesh);
    mesh.add_boundary("b_left", "wall", &left).unwrap();
    mesh.add_face("f_left", "c0", FarSide::Boundary("b_left"), &left, FaceGeometry {
        normal: Vector3::new(-1.0, 0.0, 0.0),
        area: 1.0,
        ..Default::default()
    })
    .unwrap();

    for i in 0..n {
        let right_x = (i + 1) as f64;
        let right = plane(right_x, &format!("x{}_", i + 1), &mut mesh);
        let near = format!("c{i}");
        if i + 1 < n {
            let far = format!("c{}", i + 1);
            mesh.add_face(
                format!("f{i}_{}", i + 1),
                &near,
                FarSide::Cell(&far),
                &right,
                FaceGeometry { normal: Vector3::new(1.0, 0.0, 0.0), area: 1.0, ..Default::default() },
            )
            .unwrap();
        } else {
            mesh.add_boundary("b_right", "wall", &right).unwrap();
            mesh.add_face(
                "f_right",
                &near,
                FarSide::Boundary("b_right"),
                &right,
                FaceGeometry { normal: Vector3::new(1.0, 0.0, 0.0), area: 1.0, ..Default::default() },
            )
            .unwrap();
        }
    }

    mesh.finalize().unwrap();
    mesh
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::LocalId;

    #[test]
    fn ring_graph_finalizes_on_every_rank() {
        let graphs = ring_graph(4);
        let handles: Vec<_> = graphs
            .into_iter()
            .map(|mut g| std::thread::spawn(move || g.finalize().unwrap()))
            .collect();
        for h in handles {
            h.join().unwrap();
        }
    }

    #[test]
    fn brick_corridor_lays_cells_end_to_end() {
        let mesh = brick_corridor(3);
        assert_eq!(mesh.cell(LocalId(0)).unwrap().centroid, Point3::new(0.5, 0.5, 0.5));
        assert_eq!(mesh.cell(LocalId(2)).unwrap().centroid, Point3::new(2.5, 0.5, 0.5));
    }
}
