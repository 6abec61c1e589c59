use std::cell::RefCell;
use std::rc::Rc;

use rustphy2d::prelude::*;

const DT: f32 = 1.0 / 60.0;

#[derive(Debug, Default)]
struct Events {
    sensed: usize,
    begin: usize,
    persist: usize,
    end: usize,
    post_solve: usize,
    pre_steps: u64,
    post_steps: u64,
}

struct Recorder {
    events: Rc<RefCell<Events>>,
    solve: bool,
}

impl ContactListener for Recorder {
    fn sensed(&mut self, _contact: &Contact) {
        self.events.borrow_mut().sensed += 1;
    }

    fn begin(&mut self, _contact: &Contact) -> bool {
        self.events.borrow_mut().begin += 1;
        true
    }

    fn persist(&mut self, _contact: &Contact) -> bool {
        self.events.borrow_mut().persist += 1;
        true
    }

    fn end(&mut self, _contact: &Contact) {
        self.events.borrow_mut().end += 1;
    }

    fn pre_solve(&mut self, _contact: &Contact) -> bool {
        self.solve
    }

    fn post_solve(&mut self, contact: &Contact) {
        assert!(contact.points.iter().all(|p| p.normal_impulse >= 0.0));
        self.events.borrow_mut().post_solve += 1;
    }
}

impl StepListener for Recorder {
    fn pre_step(&mut self, info: &StepInfo) {
        let mut events = self.events.borrow_mut();
        events.pre_steps += 1;
        assert_eq!(info.step_count, events.pre_steps);
    }

    fn post_step(&mut self, _info: &StepInfo) {
        self.events.borrow_mut().post_steps += 1;
    }
}

fn floor() -> Body {
    BodyDesc::fixed()
        .build()
        .with_fixture(Fixture::new(Shape::rectangle(20.0, 1.0).expect("rectangle")))
}

fn ball(y: f32) -> Body {
    BodyDesc::dynamic()
        .with_position(Vec2::new(0.0, y))
        .build()
        .with_fixture(Fixture::new(Shape::circle(0.5).expect("circle")))
}

fn recorded_world(solve: bool) -> (World, Rc<RefCell<Events>>) {
    let events = Rc::new(RefCell::new(Events::default()));
    let mut world = World::new();
    world.add_contact_listener(Recorder {
        events: events.clone(),
        solve,
    });
    world.add_step_listener(Recorder {
        events: events.clone(),
        solve,
    });
    (world, events)
}

#[test]
fn test_contact_lifecycle() {
    let (mut world, events) = recorded_world(true);
    let floor = world.add_body(floor());
    world.add_body(ball(2.0));

    for _ in 0..60 {
        world.step(DT).expect("step");
    }
    {
        let events = events.borrow();
        assert_eq!(events.begin, 1);
        assert!(events.persist > 0);
        assert!(events.post_solve > 0);
        assert_eq!(events.end, 0);
        assert_eq!(events.pre_steps, 60);
        assert_eq!(events.post_steps, 60);
    }

    world.remove_body(floor).expect("remove");
    assert_eq!(events.borrow().end, 1);
    assert_eq!(world.contact_count(), 0);
}

#[test]
fn test_pre_solve_can_disable_contacts() {
    let (mut world, events) = recorded_world(false);
    world.add_body(floor());
    let ball = world.add_body(ball(2.0));

    for _ in 0..90 {
        world.step(DT).expect("step");
    }

    // the ball fell straight through the floor
    assert!(world.body(ball).expect("ball").position().y < -1.0);
    let events = events.borrow();
    assert_eq!(events.begin, 1);
    assert_eq!(events.end, 1);
    assert_eq!(events.post_solve, 0);
}

#[test]
fn test_sensor_reports_without_blocking() {
    let (mut world, events) = recorded_world(true);
    let sensor = BodyDesc::fixed()
        .with_position(Vec2::new(0.0, 3.0))
        .build()
        .with_fixture(Fixture::new(Shape::rectangle(4.0, 1.0).expect("rectangle")).with_sensor(true));
    world.add_body(sensor);
    let ball = world.add_body(ball(6.0));

    for _ in 0..90 {
        world.step(DT).expect("step");
    }

    assert!(world.body(ball).expect("ball").position().y < 0.0);
    let events = events.borrow();
    assert!(events.sensed > 0);
    assert_eq!(events.begin, 0);
    assert_eq!(events.end, 1);
}

#[test]
fn test_filters_skip_pairs() {
    let (mut world, events) = recorded_world(true);
    let filter = CollisionFilter {
        category: 0b01,
        mask: 0b10,
    };
    world.add_body(
        BodyDesc::fixed()
            .build()
            .with_fixture(Fixture::new(Shape::rectangle(20.0, 1.0).expect("rectangle")).with_filter(filter)),
    );
    let ball = world.add_body(
        BodyDesc::dynamic()
            .with_position(Vec2::new(0.0, 2.0))
            .build()
            .with_fixture(Fixture::new(Shape::circle(0.5).expect("circle")).with_filter(filter)),
    );

    for _ in 0..90 {
        world.step(DT).expect("step");
    }

    assert!(world.body(ball).expect("ball").position().y < -1.0);
    assert_eq!(events.borrow().begin, 0);
}
