// Communication channels lock-free

use crate::messaging::command::Command;
use crate::messaging::notification::Notification;
use ringbuf::{
    HeapRb,
    traits::{Producer, Split},
};
use std::time::Duration;

/// Pause between attempts when a command buffer is full
const RETRY_INTERVAL: Duration = Duration::from_millis(1);

pub type CommandProducer = ringbuf::HeapProd<Command>;
pub type CommandConsumer = ringbuf::HeapCons<Command>;

pub fn create_command_channel(capacity: usize) -> (CommandProducer, CommandConsumer) {
    let rb = HeapRb::<Command>::new(capacity);
    rb.split()
}

/// Push a command, waiting for room while the consumer catches up
///
/// Gives the command back once `give_up` reports the consumer is gone.
pub fn push_until(
    tx: &mut CommandProducer,
    command: Command,
    give_up: impl Fn() -> bool,
) -> Result<(), Command> {
    let mut command = command;
    loop {
        match tx.try_push(command) {
            Ok(()) => return Ok(()),
            Err(rejected) if give_up() => return Err(rejected),
            Err(rejected) => {
                command = rejected;
                std::thread::sleep(RETRY_INTERVAL);
            }
        }
    }
}

pub type NotificationProducer = ringbuf::HeapProd<Notification>;
pub type NotificationConsumer = ringbuf::HeapCons<Notification>;

pub fn create_notification_channel(
    capacity: usize,
) -> (NotificationProducer, NotificationConsumer) {
    let rb = HeapRb::<Notification>::new(capacity);
    rb.split()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ringbuf::traits::Consumer;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};

    #[test]
    fn test_command_channel_capacity() {
        let (mut tx, mut rx) = create_command_channel(2);

        assert!(tx.try_push(Command::Start).is_ok());
        assert!(tx.try_push(Command::Stop).is_ok());
        assert!(tx.try_push(Command::Quit).is_err());

        assert!(matches!(rx.try_pop(), Some(Command::Start)));
        assert!(matches!(rx.try_pop(), Some(Command::Stop)));
        assert!(rx.try_pop().is_none());
    }

    #[test]
    fn test_push_until_waits_for_room() {
        let (mut tx, mut rx) = create_command_channel(1);
        tx.try_push(Command::Start).unwrap();

        let reader = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(20));
            let first = rx.try_pop();
            let mut second = None;
            while second.is_none() {
                second = rx.try_pop();
                std::thread::sleep(Duration::from_millis(1));
            }
            (first, second)
        });

        assert!(push_until(&mut tx, Command::Quit, || false).is_ok());
        let (first, second) = reader.join().unwrap();
        assert!(matches!(first, Some(Command::Start)));
        assert!(matches!(second, Some(Command::Quit)));
    }

    #[test]
    fn test_push_until_gives_command_back() {
        let (mut tx, _rx) = create_command_channel(1);
        tx.try_push(Command::Start).unwrap();

        let gone = Arc::new(AtomicBool::new(false));
        let flag = gone.clone();
        let result = push_until(&mut tx, Command::Quit, move || {
            // Consumer disappears after the first retry
            flag.swap(true, Ordering::SeqCst)
        });

        assert!(matches!(result, Err(Command::Quit)));
        assert!(gone.load(Ordering::SeqCst));
    }
}
