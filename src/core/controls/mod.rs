pub mod cooling_control;
