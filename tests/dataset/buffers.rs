//! Double-buffered storage tests

use vectorvm_dataset::{DataSet, DataSetLayout, Variable};
use vectorvm_foundation::ErrorKind;

fn particles() -> DataSet {
    let layout = DataSetLayout::new()
        .with_variable(Variable::float("age"))
        .with_variable(Variable::int("kind"));
    DataSet::new("particles", layout).unwrap()
}

#[test]
fn inputs_and_outputs_are_separate() {
    let mut set = particles();
    set.set_num_instances(3);
    set.allocate(4);
    set.write_f32(0, 2, 1.5).unwrap();
    set.write_output(0, 2, 9).unwrap();

    assert_eq!(set.read_f32(0, 2).unwrap(), 1.5);
    assert_eq!(set.read_output(0, 2).unwrap(), 9);
    assert_eq!(set.input_columns().len(), 2);
    assert_eq!(set.output_columns()[0].len(), 4);
}

#[test]
fn tick_promotes_appended_outputs() {
    let mut set = particles();
    set.set_num_instances(4);
    set.allocate(4);
    for value in [10, 20] {
        let slot = set.acquire_index(true);
        set.write_output(0, usize::try_from(slot).unwrap(), value).unwrap();
    }

    assert_eq!(set.tick(), 2);
    assert_eq!(set.num_instances(), 2);
    assert_eq!(set.read(0, 0).unwrap(), 10);
    assert_eq!(set.read(0, 1).unwrap(), 20);
    assert_eq!(set.read_output(0, 0).unwrap(), 0);
    assert_eq!(set.meta().append_count(), 0);
    assert_eq!(set.capacity(), 4);
}

#[test]
fn out_of_range_access_is_reported() {
    let mut set = particles();
    set.set_num_instances(2);
    assert!(matches!(
        set.read(0, 2).unwrap_err().kind,
        ErrorKind::InstanceOutOfBounds { index: 2, length: 2 }
    ));
    assert!(set.write(5, 0, 1).is_err());
    assert!(set.read_output(0, 0).is_err());
}

#[test]
fn layout_names_columns() {
    let set = particles();
    assert_eq!(set.name(), "particles");
    assert_eq!(set.layout().index_of("kind"), Some(1));
    assert_eq!(set.num_variables(), 2);
}
