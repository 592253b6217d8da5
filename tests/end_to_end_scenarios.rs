//! Exercises the engine's literal end-to-end scenarios: a three-rank halo
//! exchange, a particle crossing several cells within one rank, a wall
//! reflection, a cross-rank migration, an emitter's carry-over bookkeeping,
//! and ghost ghost-vertex-count agreement after finalisation.

use meshtrace::comm::LocalCommunicator;
use meshtrace::geometry::{Point3, Vector3};
use meshtrace::graph::DistributedCellGraph;
use meshtrace::ids::{GlobalId, LocalId, ParticleId, Rank};
use meshtrace::mesh::{FaceGeometry, FarSide, Region, RegionKind, UnstructuredMesh};
use meshtrace::particle::{Particle, ParticleTransport};
use meshtrace::testing::fixed_rate_emitter;
use meshtrace::ExchangePattern;

fn straight_particle(home: GlobalId, position: Point3, velocity: Vector3, travel_dt: f64) -> Particle {
    Particle::spawn(
        ParticleId(1),
        position,
        velocity,
        Vector3::zero(),
        Vector3::zero(),
        home,
        Rank(0),
        1.0,
        0.0,
        travel_dt,
    )
}

/// Scenario: a three-rank ring exchange of an integer payload. Rank0 owns
/// {A,B}, rank1 owns {C,D}, rank2 owns {E,F}; after one exchange each ghost
/// slot holds the global id of the cell it shadows.
#[test]
fn three_rank_ring_exchange_round_trips_global_ids() {
    let mut shared = LocalCommunicator::cluster(3);
    let comm2 = shared.pop().unwrap();
    let comm1 = shared.pop().unwrap();
    let comm0 = shared.pop().unwrap();

    let mut g0 = DistributedCellGraph::new(comm0);
    g0.add_local_node("A").unwrap();
    g0.add_local_node("B").unwrap();
    g0.add_ghost_node("C").unwrap();
    g0.add_ghost_node("F").unwrap();
    g0.add_undirected_edge("A", "C").unwrap();
    g0.add_undirected_edge("B", "F").unwrap();

    let mut g1 = DistributedCellGraph::new(comm1);
    g1.add_local_node("C").unwrap();
    g1.add_local_node("D").unwrap();
    g1.add_ghost_node("A").unwrap();
    g1.add_ghost_node("E").unwrap();
    g1.add_undirected_edge("C", "A").unwrap();
    g1.add_undirected_edge("D", "E").unwrap();

    let mut g2 = DistributedCellGraph::new(comm2);
    g2.add_local_node("E").unwrap();
    g2.add_local_node("F").unwrap();
    g2.add_ghost_node("D").unwrap();
    g2.add_ghost_node("B").unwrap();
    g2.add_undirected_edge("E", "D").unwrap();
    g2.add_undirected_edge("F", "B").unwrap();

    let handles = vec![
        std::thread::spawn(move || run_rank(g0)),
        std::thread::spawn(move || run_rank(g1)),
        std::thread::spawn(move || run_rank(g2)),
    ];
    for h in handles {
        h.join().unwrap();
    }

    fn run_rank(mut g: DistributedCellGraph<LocalCommunicator>) {
        g.finalize().unwrap();
        let mut owned_then_global = vec![0i64; g.num_local()];
        for i in 0..g.num_owned() {
            owned_then_global[i] = g.local_to_global(LocalId(i)).unwrap().0 as i64;
        }
        let mut pattern: ExchangePattern<LocalCommunicator, i64> =
            ExchangePattern::build(&g).unwrap();
        pattern.exchange(&mut owned_then_global).unwrap();
        for i in g.num_owned()..g.num_local() {
            let expected = g.local_to_global(LocalId(i)).unwrap().0 as i64;
            assert_eq!(owned_then_global[i], expected);
        }
    }
}

/// A single brick of three unit cells along `+x`: a particle starting near
/// the left wall crosses two interior faces, reflects off the far wall, and
/// comes to rest back inside the third cell once its travel for the step is
/// spent.
#[test]
fn particle_crosses_three_cells_in_a_single_brick() {
    let mut comms = LocalCommunicator::cluster(1);
    let mut mesh = UnstructuredMesh::new(comms.remove(0));
    mesh.add_region("wall", Region { kind: RegionKind::Wall, ..Region::default() }).unwrap();

    for i in 0..3 {
        mesh.add_cell(format!("c{i}"), true, Point3::new(i as f64 + 0.5, 0.5, 0.5), 1.0).unwrap();
    }

    let plane = |x: f64, prefix: &str, mesh: &mut UnstructuredMesh<LocalCommunicator>| {
        let coords = [(x, 0.0, 0.0), (x, 1.0, 0.0), (x, 1.0, 1.0), (x, 0.0, 1.0)];
        coords
            .iter()
            .enumerate()
            .map(|(i, &(px, py, pz))| {
                let label = format!("{prefix}{i}");
                mesh.add_vertex(label.clone(), Point3::new(px, py, pz)).unwrap();
                label
            })
            .collect::<Vec<_>>()
    };

    let x0 = plane(0.0, "x0_", &mut mesh);
    let x1 = plane(1.0, "x1_", &mut mesh);
    let x2 = plane(2.0, "x2_", &mut mesh);
    let x3 = plane(3.0, "x3_", &mut mesh);

    mesh.add_boundary("b_left", "wall", &x0).unwrap();
    mesh.add_boundary("b_right", "wall", &x3).unwrap();

    mesh.add_face("f_left", "c0", FarSide::Boundary("b_left"), &x0, FaceGeometry {
        normal: Vector3::new(-1.0, 0.0, 0.0),
        area: 1.0,
        ..Default::default()
    })
    .unwrap();
    mesh.add_face("f01", "c0", FarSide::Cell("c1"), &x1, FaceGeometry {
        normal: Vector3::new(1.0, 0.0, 0.0),
        area: 1.0,
        ..Default::default()
    })
    .unwrap();
    mesh.add_face("f12", "c1", FarSide::Cell("c2"), &x2, FaceGeometry {
        normal: Vector3::new(1.0, 0.0, 0.0),
        area: 1.0,
        ..Default::default()
    })
    .unwrap();
    mesh.add_face("f_right", "c2", FarSide::Boundary("b_right"), &x3, FaceGeometry {
        normal: Vector3::new(1.0, 0.0, 0.0),
        area: 1.0,
        ..Default::default()
    })
    .unwrap();

    mesh.finalize().unwrap();

    let c0 = mesh.graph().label_to_local("c0").unwrap();
    let c0_global = mesh.graph().local_to_global(c0).unwrap();
    let particle = straight_particle(
        c0_global,
        Point3::new(0.1, 0.5, 0.5),
        Vector3::new(1.0, 0.0, 0.0),
        3.0,
    );

    let mut transport = ParticleTransport::new(&mesh);
    transport.inject(vec![particle]);
    transport.run_step(3.0).unwrap();

    assert_eq!(transport.active().len(), 1);
    let p = &transport.active()[0];
    // Two interior hand-offs (x=1.0, x=2.0) land it against the far wall at
    // x=3.0 with 0.1 of travel_dt still unspent; it reflects there and
    // travels back 0.1 units before the step's budget runs out.
    assert!((p.position.x - 2.9).abs() < 1e-9, "expected x=2.9, got {}", p.position.x);
    assert!((p.position.y - 0.5).abs() < 1e-9 && (p.position.z - 0.5).abs() < 1e-9);
    assert!((p.velocity.x + 1.0).abs() < 1e-9, "should have reflected to -x off the far wall");

    let c2 = mesh.graph().label_to_local("c2").unwrap();
    assert_eq!(p.current_cell, mesh.graph().local_to_global(c2).unwrap());
}

/// A particle inside a single cubic cell hits a `+x` wall and reflects back
/// past its starting point, reversing its velocity and returning to its
/// original position within the same step.
#[test]
fn particle_reflects_off_a_wall_and_returns_to_start() {
    let mut comms = LocalCommunicator::cluster(1);
    let mut mesh = UnstructuredMesh::new(comms.remove(0));
    mesh.add_region("wall", Region { kind: RegionKind::Wall, ..Region::default() }).unwrap();
    mesh.add_cell("c0", true, Point3::new(0.5, 0.5, 0.5), 1.0).unwrap();

    let plane = |x: f64, prefix: &str, mesh: &mut UnstructuredMesh<LocalCommunicator>| {
        let coords = [(x, 0.0, 0.0), (x, 1.0, 0.0), (x, 1.0, 1.0), (x, 0.0, 1.0)];
        coords
            .iter()
            .enumerate()
            .map(|(i, &(px, py, pz))| {
                let label = format!("{prefix}{i}");
                mesh.add_vertex(label.clone(), Point3::new(px, py, pz)).unwrap();
                label
            })
            .collect::<Vec<_>>()
    };

    let left = plane(0.0, "left_", &mut mesh);
    let right = plane(1.0, "right_", &mut mesh);
    mesh.add_boundary("b_left", "wall", &left).unwrap();
    mesh.add_boundary("b_right", "wall", &right).unwrap();
    mesh.add_face("f_left", "c0", FarSide::Boundary("b_left"), &left, FaceGeometry {
        normal: Vector3::new(-1.0, 0.0, 0.0),
        area: 1.0,
        ..Default::default()
    })
    .unwrap();
    mesh.add_face("f_right", "c0", FarSide::Boundary("b_right"), &right, FaceGeometry {
        normal: Vector3::new(1.0, 0.0, 0.0),
        area: 1.0,
        ..Default::default()
    })
    .unwrap();
    mesh.finalize().unwrap();

    let c0 = mesh.graph().label_to_local("c0").unwrap();
    let c0_global = mesh.graph().local_to_global(c0).unwrap();
    let particle = straight_particle(
        c0_global,
        Point3::new(0.5, 0.5, 0.5),
        Vector3::new(1.0, 0.0, 0.0),
        1.0,
    );

    let mut transport = ParticleTransport::new(&mesh);
    transport.inject(vec![particle]);
    transport.run_step(1.0).unwrap();

    let after = &transport.active()[0];
    assert!((after.velocity.x + 1.0).abs() < 1e-9, "expected velocity.x=-1.0, got {}", after.velocity.x);
    assert!((after.position.x - 0.5).abs() < 1e-9, "expected x=0.5, got {}", after.position.x);
    assert_eq!(after.current_cell, c0_global);
}

/// Two ranks each owning two cells in a corridor: rank0 owns {c0, c1},
/// rank1 owns {c2, c3}, and the `c1`-`c2` face is the only migration edge.
/// A particle starting in `c0` crosses all the way into `c3`, migrating
/// once, and the receiving rank rediscovers the correct entry face.
#[test]
fn particle_migrates_across_a_rank_boundary() {
    let mut comms = LocalCommunicator::cluster(2);
    let comm1 = comms.remove(1);
    let comm0 = comms.remove(0);

    let plane = |x: f64, prefix: &str, mesh: &mut UnstructuredMesh<LocalCommunicator>| {
        let coords = [(x, 0.0, 0.0), (x, 1.0, 0.0), (x, 1.0, 1.0), (x, 0.0, 1.0)];
        coords
            .iter()
            .enumerate()
            .map(|(i, &(px, py, pz))| {
                let label = format!("{prefix}{i}");
                mesh.add_vertex(label.clone(), Point3::new(px, py, pz)).unwrap();
                label
            })
            .collect::<Vec<_>>()
    };

    let build_rank0 = move || {
        let mut mesh = UnstructuredMesh::new(comm0);
        mesh.add_cell("c0", true, Point3::new(0.5, 0.5, 0.5), 1.0).unwrap();
        mesh.add_cell("c1", true, Point3::new(1.5, 0.5, 0.5), 1.0).unwrap();
        mesh.add_cell("c2", false, Point3::new(2.5, 0.5, 0.5), 1.0).unwrap();

        let x1 = plane(1.0, "x1_", &mut mesh);
        let x2 = plane(2.0, "x2_", &mut mesh);
        mesh.add_face("f01", "c0", FarSide::Cell("c1"), &x1, FaceGeometry {
            normal: Vector3::new(1.0, 0.0, 0.0),
            area: 1.0,
            ..Default::default()
        })
        .unwrap();
        mesh.add_face("f12", "c1", FarSide::Cell("c2"), &x2, FaceGeometry {
            normal: Vector3::new(1.0, 0.0, 0.0),
            area: 1.0,
            ..Default::default()
        })
        .unwrap();
        mesh.finalize().unwrap();

        let c0 = mesh.graph().label_to_local("c0").unwrap();
        let c0_global = mesh.graph().local_to_global(c0).unwrap();
        let particle = straight_particle(
            c0_global,
            Point3::new(0.5, 0.5, 0.5),
            Vector3::new(1.0, 0.0, 0.0),
            3.4,
        );

        let mut transport = ParticleTransport::new(&mesh);
        transport.inject(vec![particle]);
        transport.run_step(3.4).unwrap();
        assert!(transport.active().is_empty(), "particle should have migrated off rank0");
    };

    let build_rank1 = move || {
        let mut mesh = UnstructuredMesh::new(comm1);
        mesh.add_cell("c1", false, Point3::new(1.5, 0.5, 0.5), 1.0).unwrap();
        mesh.add_cell("c2", true, Point3::new(2.5, 0.5, 0.5), 1.0).unwrap();
        mesh.add_cell("c3", true, Point3::new(3.5, 0.5, 0.5), 1.0).unwrap();
        mesh.add_region("wall", Region { kind: RegionKind::Wall, ..Region::default() }).unwrap();

        let x2 = plane(2.0, "x2_", &mut mesh);
        let x3 = plane(3.0, "x3_", &mut mesh);
        let x4 = plane(4.0, "x4_", &mut mesh);
        mesh.add_face("f12", "c2", FarSide::Cell("c1"), &x2, FaceGeometry {
            normal: Vector3::new(-1.0, 0.0, 0.0),
            area: 1.0,
            ..Default::default()
        })
        .unwrap();
        mesh.add_face("f23", "c2", FarSide::Cell("c3"), &x3, FaceGeometry {
            normal: Vector3::new(1.0, 0.0, 0.0),
            area: 1.0,
            ..Default::default()
        })
        .unwrap();
        mesh.add_boundary("b_right", "wall", &x4).unwrap();
        mesh.add_face("f_right", "c3", FarSide::Boundary("b_right"), &x4, FaceGeometry {
            normal: Vector3::new(1.0, 0.0, 0.0),
            area: 1.0,
            ..Default::default()
        })
        .unwrap();
        mesh.finalize().unwrap();

        let mut transport = ParticleTransport::new(&mesh);
        transport.run_step(3.4).unwrap();

        assert_eq!(transport.active().len(), 1);
        let p = &transport.active()[0];
        let c3 = mesh.graph().label_to_local("c3").unwrap();
        assert_eq!(p.current_cell, mesh.graph().local_to_global(c3).unwrap());
        assert!((p.position.x - 3.9).abs() < 1e-9, "expected x=3.9, got {}", p.position.x);

        let entry_face = mesh.face(p.entry_face).unwrap();
        assert!(!entry_face.is_boundary(), "entry face into c3 must be the c2-c3 interior face");
    };

    let handles = vec![std::thread::spawn(build_rank0), std::thread::spawn(build_rank1)];
    for h in handles {
        h.join().unwrap();
    }
}

/// A fixed-rate emitter injected straight into a transport engine: the
/// carry-over bookkeeping from [`meshtrace::particle::ParticleEmitter`]
/// survives a round trip through [`ParticleTransport::inject`] and
/// [`ParticleTransport::run_step`].
#[test]
fn fixed_rate_emitter_feeds_the_transport_engine() {
    let mut comms = LocalCommunicator::cluster(1);
    let mut mesh = UnstructuredMesh::new(comms.remove(0));
    mesh.add_region("wall", Region { kind: RegionKind::Wall, ..Region::default() }).unwrap();
    mesh.add_cell("home", true, Point3::new(0.5, 0.5, 0.5), 1.0).unwrap();

    let plane = |x: f64, prefix: &str, mesh: &mut UnstructuredMesh<LocalCommunicator>| {
        let coords = [(x, 0.0, 0.0), (x, 1.0, 0.0), (x, 1.0, 1.0), (x, 0.0, 1.0)];
        coords
            .iter()
            .enumerate()
            .map(|(i, &(px, py, pz))| {
                let label = format!("{prefix}{i}");
                mesh.add_vertex(label.clone(), Point3::new(px, py, pz)).unwrap();
                label
            })
            .collect::<Vec<_>>()
    };
    let left = plane(0.0, "left_", &mut mesh);
    let right = plane(100.0, "right_", &mut mesh);
    mesh.add_boundary("b_left", "wall", &left).unwrap();
    mesh.add_boundary("b_right", "wall", &right).unwrap();
    mesh.add_face("f_left", "home", FarSide::Boundary("b_left"), &left, FaceGeometry {
        normal: Vector3::new(-1.0, 0.0, 0.0),
        area: 1.0,
        ..Default::default()
    })
    .unwrap();
    mesh.add_face("f_right", "home", FarSide::Boundary("b_right"), &right, FaceGeometry {
        normal: Vector3::new(1.0, 0.0, 0.0),
        area: 1.0,
        ..Default::default()
    })
    .unwrap();
    mesh.finalize().unwrap();

    let home = mesh.graph().label_to_local("home").unwrap();
    let home_global = mesh.graph().local_to_global(home).unwrap();

    let mut emitter = fixed_rate_emitter(0.5, home_global);
    let mut transport = ParticleTransport::new(&mesh);

    let first_batch = emitter.generate_particles(2.0).unwrap();
    assert_eq!(first_batch.len(), 4);
    transport.inject(first_batch);
    transport.run_step(2.0).unwrap();
    assert_eq!(transport.active().len(), 4);

    let second_batch = emitter.generate_particles(0.25).unwrap();
    assert!(second_batch.is_empty());
}

/// After `finalize`, a ghost cell's exchanged global vertex count reflects
/// the owner's full stored vertex count, independent of how many of those
/// vertices the ghosting rank itself stored.
#[test]
fn ghost_cell_reports_owners_global_vertex_count() {
    let mut comms = LocalCommunicator::cluster(2);
    let comm1 = comms.remove(1);
    let comm0 = comms.remove(0);

    let owner = std::thread::spawn(move || {
        let mut mesh = UnstructuredMesh::new(comm0);
        mesh.add_region("wall", Region { kind: RegionKind::Wall, ..Region::default() }).unwrap();
        mesh.add_cell("shared", true, Point3::new(0.5, 0.5, 0.5), 1.0).unwrap();
        mesh.add_cell("neighbour", false, Point3::new(1.5, 0.5, 0.5), 1.0).unwrap();

        let coords = [
            (0.0, 0.0, 0.0),
            (1.0, 0.0, 0.0),
            (1.0, 1.0, 0.0),
            (0.0, 1.0, 0.0),
            (0.0, 0.0, 1.0),
            (1.0, 0.0, 1.0),
            (1.0, 1.0, 1.0),
            (0.0, 1.0, 1.0),
        ];
        for (i, &(x, y, z)) in coords.iter().enumerate() {
            mesh.add_vertex(format!("v{i}"), Point3::new(x, y, z)).unwrap();
        }
        let face_verts = |ids: [usize; 4]| ids.iter().map(|i| format!("v{i}")).collect::<Vec<_>>();

        mesh.add_boundary("b0", "wall", &face_verts([0, 1, 2, 3])).unwrap();
        mesh.add_boundary("b_top", "wall", &face_verts([4, 5, 6, 7])).unwrap();
        mesh.add_face(
            "f_bottom",
            "shared",
            FarSide::Boundary("b0"),
            &face_verts([0, 1, 2, 3]),
            FaceGeometry { normal: Vector3::new(0.0, 0.0, -1.0), area: 1.0, ..Default::default() },
        )
        .unwrap();
        mesh.add_face(
            "f_shared_neighbour",
            "shared",
            FarSide::Cell("neighbour"),
            &face_verts([1, 2, 6, 5]),
            FaceGeometry { normal: Vector3::new(1.0, 0.0, 0.0), area: 1.0, ..Default::default() },
        )
        .unwrap();
        mesh.add_face(
            "f_top",
            "shared",
            FarSide::Boundary("b_top"),
            &face_verts([4, 5, 6, 7]),
            FaceGeometry { normal: Vector3::new(0.0, 0.0, 1.0), area: 1.0, ..Default::default() },
        )
        .unwrap();

        mesh.finalize().unwrap();
        let shared = mesh.graph().label_to_local("shared").unwrap();
        assert_eq!(mesh.cell(shared).unwrap().stored_vertex_count, 8);
    });

    let ghosting = std::thread::spawn(move || {
        let mut mesh = UnstructuredMesh::new(comm1);
        mesh.add_cell("shared", false, Point3::new(0.5, 0.5, 0.5), 1.0).unwrap();
        mesh.add_cell("neighbour", true, Point3::new(1.5, 0.5, 0.5), 1.0).unwrap();

        // This rank only stores the single face (and its 4 vertices) that
        // touch its own owned cell; it never sees the other 4 vertices of
        // the shared ghost cell.
        let coords = [(1.0, 0.0, 0.0), (1.0, 1.0, 0.0), (1.0, 1.0, 1.0), (1.0, 0.0, 1.0)];
        for (i, &(x, y, z)) in coords.iter().enumerate() {
            mesh.add_vertex(format!("v{i}"), Point3::new(x, y, z)).unwrap();
        }
        let face_verts: Vec<String> = (0..4).map(|i| format!("v{i}")).collect();
        mesh.add_face(
            "f_shared_neighbour",
            "neighbour",
            FarSide::Cell("shared"),
            &face_verts,
            FaceGeometry { normal: Vector3::new(-1.0, 0.0, 0.0), area: 1.0, ..Default::default() },
        )
        .unwrap();
        mesh.finalize().unwrap();

        let shared = mesh.graph().label_to_local("shared").unwrap();
        let cell = mesh.cell(shared).unwrap();
        assert_eq!(cell.stored_vertex_count, 4, "ghost only stores the shared face's vertices");
        assert_eq!(cell.global_vertex_count, 8, "but learns the owner's full count by exchange");
    });

    owner.join().unwrap();
    ghosting.join().unwrap();
}

